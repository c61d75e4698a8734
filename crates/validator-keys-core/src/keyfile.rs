//! JSON key file.
//!
//! ```json
//! {
//!   "key_type": "ed25519",
//!   "public_key": "nHU...",
//!   "secret_key": "pa1..." | "external",
//!   "token_sequence": 3,
//!   "revoked": false,
//!   "domain": "example.com",
//!   "manifest": "<hex>",
//!   "pending_token_secret": "pn...",
//!   "pending_key_type": "secp256k1",
//!   "pending_revocation": true
//! }
//! ```
//!
//! The last five fields are optional. The two pending token fields come
//! as a pair.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::crypto::KeyType;
use crate::encoding::{
    decode_node_private, decode_node_public, encode_node_private, encode_node_public, from_hex,
    to_hex,
};
use crate::error::{KeyError, KeyResult};
use crate::keys::{KeyMaterial, PendingOperation, ValidatorKeys};

/// `secret_key` value of a key file whose master secret is kept elsewhere.
pub const EXTERNAL_SECRET: &str = "external";

const REQUIRED_FIELDS: [&str; 4] = ["key_type", "secret_key", "token_sequence", "revoked"];

#[derive(Serialize)]
struct KeyFileDocument<'a> {
    key_type: &'static str,
    public_key: String,
    secret_key: String,
    token_sequence: u32,
    revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_token_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_key_type: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pending_revocation: bool,
}

impl<'a> KeyFileDocument<'a> {
    fn new(keys: &'a ValidatorKeys) -> Self {
        let (pending_token_secret, pending_key_type) = match keys.pending() {
            PendingOperation::Token {
                secret_key,
                key_type,
            } => (
                Some(encode_node_private(secret_key)),
                Some(key_type.as_str()),
            ),
            _ => (None, None),
        };
        let manifest = keys.manifest_bytes();

        Self {
            key_type: keys.key_type().as_str(),
            public_key: encode_node_public(keys.public_key()),
            secret_key: keys
                .secret_key()
                .map_or_else(|| EXTERNAL_SECRET.to_string(), encode_node_private),
            token_sequence: keys.token_sequence(),
            revoked: keys.revoked(),
            domain: keys.domain(),
            manifest: (!manifest.is_empty()).then(|| to_hex(manifest)),
            pending_token_secret,
            pending_key_type,
            pending_revocation: matches!(keys.pending(), PendingOperation::Revocation),
        }
    }
}

/// Typed access to the fields of a parsed key file.
struct Fields<'a> {
    path: &'a Path,
    doc: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.doc.get(field)
    }

    fn require(&self, field: &'static str) -> KeyResult<&'a Value> {
        self.get(field).ok_or_else(|| self.missing(field))
    }

    fn missing(&self, field: &'static str) -> KeyError {
        KeyError::MissingField {
            path: self.path.to_path_buf(),
            field,
        }
    }

    fn invalid(&self, field: &'static str) -> KeyError {
        KeyError::InvalidField {
            path: self.path.to_path_buf(),
            field,
            value: self.get(field).map(Value::to_string).unwrap_or_default(),
        }
    }

    fn string(&self, field: &'static str) -> KeyResult<&'a str> {
        self.require(field)?
            .as_str()
            .ok_or_else(|| self.invalid(field))
    }

    fn key_type(&self, field: &'static str) -> KeyResult<KeyType> {
        self.string(field)?
            .parse()
            .map_err(|_| self.invalid(field))
    }
}

/// Read a key file.
pub fn load(path: impl AsRef<Path>) -> KeyResult<ValidatorKeys> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        // Not UTF-8
        io::ErrorKind::InvalidData => KeyError::KeyFileParse {
            path: path.to_path_buf(),
        },
        _ => KeyError::KeyFileOpen {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let Ok(Value::Object(doc)) = serde_json::from_str::<Value>(&content) else {
        return Err(KeyError::KeyFileParse {
            path: path.to_path_buf(),
        });
    };
    let fields = Fields { path, doc: &doc };

    for field in REQUIRED_FIELDS {
        fields.require(field)?;
    }

    let key_type = fields.key_type("key_type")?;
    let keys = load_key_material(&fields, key_type)?;

    let token_sequence = fields
        .require("token_sequence")?
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| fields.invalid("token_sequence"))?;
    let revoked = fields
        .require("revoked")?
        .as_bool()
        .ok_or_else(|| fields.invalid("revoked"))?;

    let mut keys = ValidatorKeys::from_material(keys, token_sequence, revoked);

    if fields.get("domain").is_some() {
        keys.set_domain(fields.string("domain")?)?;
    }

    if fields.get("manifest").is_some() {
        let manifest = from_hex(fields.string("manifest")?)
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| fields.invalid("manifest"))?;
        keys.restore_manifest(manifest);
    }

    keys.restore_pending(load_pending(&fields)?);

    debug!(
        path = %path.display(),
        key_type = %keys.key_type(),
        sequence = keys.token_sequence(),
        revoked = keys.revoked(),
        external = keys.is_external(),
        "loaded key file"
    );
    Ok(keys)
}

fn load_key_material(fields: &Fields<'_>, key_type: KeyType) -> KeyResult<KeyMaterial> {
    let secret = fields.string("secret_key")?;

    if secret == EXTERNAL_SECRET {
        let public_key = decode_node_public(fields.string("public_key")?)
            .filter(|key| key.key_type() == key_type)
            .ok_or_else(|| fields.invalid("public_key"))?;
        return Ok(KeyMaterial::external(public_key));
    }

    let keys = decode_node_private(secret)
        .and_then(|secret| KeyMaterial::from_secret(key_type, secret).ok())
        .ok_or_else(|| fields.invalid("secret_key"))?;

    // Optional next to a secret, but it has to be the matching key
    if fields.get("public_key").is_some() {
        let stored = fields.string("public_key")?;
        if decode_node_public(stored).as_ref() != Some(keys.public_key()) {
            return Err(fields.invalid("public_key"));
        }
    }

    Ok(keys)
}

fn load_pending(fields: &Fields<'_>) -> KeyResult<PendingOperation> {
    let revocation = match fields.get("pending_revocation") {
        Some(value) => value
            .as_bool()
            .ok_or_else(|| fields.invalid("pending_revocation"))?,
        None => false,
    };

    let token = match (
        fields.get("pending_token_secret"),
        fields.get("pending_key_type"),
    ) {
        (None, None) => None,
        (Some(_), None) => return Err(fields.missing("pending_key_type")),
        (None, Some(_)) => return Err(fields.missing("pending_token_secret")),
        (Some(_), Some(_)) => {
            let secret_key = decode_node_private(fields.string("pending_token_secret")?)
                .ok_or_else(|| fields.invalid("pending_token_secret"))?;
            let key_type = fields.key_type("pending_key_type")?;
            Some(PendingOperation::Token {
                secret_key,
                key_type,
            })
        }
    };

    match (token, revocation) {
        (Some(_), true) => Err(fields.invalid("pending_revocation")),
        (Some(token), false) => Ok(token),
        (None, true) => Ok(PendingOperation::Revocation),
        (None, false) => Ok(PendingOperation::None),
    }
}

/// Write a key file, creating missing parent directories.
///
/// The document goes to a sibling temp file first and is renamed over
/// `path` only once it is fully on disk, so a failed save leaves the
/// previous key file in place.
pub fn save(keys: &ValidatorKeys, path: impl AsRef<Path>) -> KeyResult<()> {
    let path = path.as_ref();
    let mut content = serde_json::to_string_pretty(&KeyFileDocument::new(keys)).map_err(|e| {
        KeyError::KeyFileWrite {
            path: path.to_path_buf(),
            source: io::Error::other(e),
        }
    })?;
    content.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let created = parent.exists() || fs::create_dir_all(parent).is_ok();
        if !created || !parent.is_dir() {
            return Err(KeyError::CreateDirectory {
                path: parent.to_path_buf(),
            });
        }
    }

    let temp_path = temp_path(path);
    let mut file = open_for_write(&temp_path).map_err(|source| KeyError::KeyFileCreate {
        path: path.to_path_buf(),
        source,
    })?;
    let written = file
        .write_all(content.as_bytes())
        .and_then(|()| file.sync_all());
    drop(file);
    let replaced = written
        .map_err(|source| KeyError::KeyFileWrite {
            path: path.to_path_buf(),
            source,
        })
        .and_then(|()| {
            fs::rename(&temp_path, path).map_err(|source| KeyError::KeyFileCreate {
                path: path.to_path_buf(),
                source,
            })
        });
    if let Err(e) = replaced {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    info!(path = %path.display(), "saved key file");
    Ok(())
}

/// `validator-keys.json` -> `validator-keys.json.tmp`, in the same directory.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// Owner-only, including a stale temp file left with wider permissions.
#[cfg(unix)]
fn open_for_write(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_for_write(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl ValidatorKeys {
    /// Read keys from `path`. See [`load`].
    pub fn load(path: impl AsRef<Path>) -> KeyResult<Self> {
        load(path)
    }

    /// Write keys to `path`. See [`save`].
    pub fn save(&self, path: impl AsRef<Path>) -> KeyResult<()> {
        save(self, path)
    }
}
