//! Error types for validator key management.

use std::path::PathBuf;

use crate::crypto::KeyType;

/// Validator key errors.
///
/// Running out of token sequence numbers and asking for a token after the
/// keys were revoked are not errors: those operations return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// Key file could not be read.
    #[error("failed to open key file: {}", path.display())]
    KeyFileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Parent directory of a key file could not be created.
    #[error("cannot create directory: {}", path.display())]
    CreateDirectory { path: PathBuf },

    /// Key file could not be opened for writing.
    #[error("cannot open key file: {}", path.display())]
    KeyFileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key file was opened but writing it failed.
    #[error("failed to write key file: {}", path.display())]
    KeyFileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key file is not a JSON object.
    #[error("unable to parse json key file: {}", path.display())]
    KeyFileParse { path: PathBuf },

    /// Required key file field is absent.
    #[error("key file '{}' is missing \"{field}\" field", path.display())]
    MissingField { path: PathBuf, field: &'static str },

    /// Key file field is present but has the wrong type or shape.
    #[error("key file '{}' contains invalid \"{field}\" field: {value}", path.display())]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        value: String,
    },

    /// Operator-supplied public key is not base58, hex or base64 of a valid key.
    #[error("unable to parse public key: {value}")]
    InvalidPublicKey { value: String },

    /// Unknown key type name.
    #[error("unknown key type: {value}")]
    UnknownKeyType { value: String },

    /// Manifest bytes do not decode.
    #[error("malformed manifest: {reason}")]
    MalformedManifest { reason: String },

    /// Manifest signatures do not check out.
    #[error("manifest is not properly signed")]
    ManifestNotSigned,

    /// `finish_token` without a staged token.
    #[error("no pending token to finish")]
    NoPendingToken,

    /// Externally supplied signature is neither hex nor base64.
    #[error("invalid master signature")]
    InvalidMasterSignature,

    /// Data handed to `sign_hex` is not hex.
    #[error("could not decode hex string: {value}")]
    InvalidHex { value: String },

    /// Token or revocation signing needs the master secret.
    #[error("this key file cannot be used to sign tokens")]
    CannotSignTokens,

    /// Ad-hoc signing needs the master secret.
    #[error("this key file cannot be used to sign")]
    CannotSign,

    /// Secret key bytes are outside the algorithm's valid range.
    #[error("invalid {key_type} secret key")]
    InvalidSecretKey { key_type: KeyType },

    /// Domain is too short or too long.
    #[error("the domain must be between {min} and {max} characters long")]
    DomainLength { min: usize, max: usize },

    /// Domain does not look like a host name.
    #[error("the domain field must use the '[host.][subdomain.]domain.tld' format")]
    DomainFormat,
}

impl KeyError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // File system
            Self::KeyFileOpen { .. }
            | Self::CreateDirectory { .. }
            | Self::KeyFileCreate { .. }
            | Self::KeyFileWrite { .. } => 2,

            // Malformed input
            Self::KeyFileParse { .. }
            | Self::MissingField { .. }
            | Self::InvalidField { .. }
            | Self::InvalidPublicKey { .. }
            | Self::UnknownKeyType { .. }
            | Self::MalformedManifest { .. } => 3,

            // Protocol
            Self::ManifestNotSigned
            | Self::NoPendingToken
            | Self::InvalidMasterSignature
            | Self::InvalidHex { .. } => 4,

            // Capability
            Self::CannotSignTokens | Self::CannotSign | Self::InvalidSecretKey { .. } => 5,

            // Validation
            Self::DomainLength { .. } | Self::DomainFormat => 6,
        }
    }
}

/// Result type for key operations.
pub type KeyResult<T> = Result<T, KeyError>;
