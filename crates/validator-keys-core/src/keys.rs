//! Validator key state: master key material, token sequence and revocation.
//!
//! Tokens can be minted two ways:
//!
//! - locally, with [`ValidatorKeys::create_token`], when the master secret
//!   is in the key file;
//! - in two phases, with [`ValidatorKeys::start_token`] and
//!   [`ValidatorKeys::finish_token`], when the master secret lives on another
//!   device and only its signature over the staged pre-image comes back.
//!
//! Revocation works the same way. Every manifest is verified before it is
//! committed, and a failed operation leaves the state untouched.

use serde_json::json;
use tracing::debug;

use crate::crypto::{self, KeyType, PublicKey, SecretKey};
use crate::domain::validate_domain;
use crate::encoding::{from_hex, to_base64, to_hex};
use crate::error::{KeyError, KeyResult};
use crate::manifest::{Manifest, ManifestKind, SEQUENCE_MAX};

/// Master key pair, or just the public half when signing happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// The secret is held here. Build with [`KeyMaterial::generate`] or
    /// [`KeyMaterial::from_secret`] so the public key always matches.
    #[non_exhaustive]
    Local {
        public_key: PublicKey,
        secret_key: SecretKey,
    },
    /// External signing mode.
    External { public_key: PublicKey },
}

impl KeyMaterial {
    pub fn generate(key_type: KeyType) -> Self {
        let (secret_key, public_key) = crypto::generate_key_pair(key_type);
        Self::Local {
            public_key,
            secret_key,
        }
    }

    pub fn from_secret(key_type: KeyType, secret_key: SecretKey) -> KeyResult<Self> {
        let public_key = crypto::derive_public_key(key_type, &secret_key)?;
        Ok(Self::Local {
            public_key,
            secret_key,
        })
    }

    pub fn external(public_key: PublicKey) -> Self {
        Self::External { public_key }
    }

    pub fn public_key(&self) -> &PublicKey {
        match self {
            Self::Local { public_key, .. } | Self::External { public_key } => public_key,
        }
    }

    pub fn secret_key(&self) -> Option<&SecretKey> {
        match self {
            Self::Local { secret_key, .. } => Some(secret_key),
            Self::External { .. } => None,
        }
    }

    /// The only way to produce a master signature.
    fn signer(&self) -> Option<MasterSigner<'_>> {
        match self {
            Self::Local {
                public_key,
                secret_key,
            } => Some(MasterSigner {
                key_type: public_key.key_type(),
                secret_key,
            }),
            Self::External { .. } => None,
        }
    }
}

struct MasterSigner<'a> {
    key_type: KeyType,
    secret_key: &'a SecretKey,
}

impl MasterSigner<'_> {
    fn sign(&self, message: &[u8]) -> KeyResult<Vec<u8>> {
        crypto::sign(self.key_type, self.secret_key, message)
    }
}

/// Operation staged for an external master signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PendingOperation {
    #[default]
    None,
    /// Ephemeral key waiting for `finish_token`.
    Token {
        secret_key: SecretKey,
        key_type: KeyType,
    },
    /// `start_revoke` handed out the revocation pre-image.
    Revocation,
}

/// A freshly minted token: the signed manifest and the ephemeral secret the
/// validator signs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorToken {
    /// Base64 of the signed manifest.
    pub manifest: String,
    pub secret_key: SecretKey,
}

impl ValidatorToken {
    /// Text for the `[validator_token]` config section: base64 of a JSON
    /// object holding the manifest and the hex secret.
    pub fn encode(&self) -> String {
        let document = json!({
            "manifest": self.manifest,
            "validation_secret_key": to_hex(self.secret_key.as_bytes()),
        });
        to_base64(document.to_string().as_bytes())
    }
}

/// Validator key state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorKeys {
    keys: KeyMaterial,
    token_sequence: u32,
    revoked: bool,
    domain: Option<String>,
    manifest: Vec<u8>,
    pending: PendingOperation,
}

impl ValidatorKeys {
    /// Generate a new master key.
    pub fn new(key_type: KeyType) -> Self {
        Self::from_material(KeyMaterial::generate(key_type), 0, false)
    }

    /// Wrap an existing master secret.
    pub fn from_secret(key_type: KeyType, secret_key: SecretKey) -> KeyResult<Self> {
        Ok(Self::from_material(
            KeyMaterial::from_secret(key_type, secret_key)?,
            0,
            false,
        ))
    }

    /// Public key only; every master signature comes from outside.
    pub fn external(public_key: PublicKey) -> Self {
        Self::from_material(KeyMaterial::external(public_key), 0, false)
    }

    pub fn from_material(keys: KeyMaterial, token_sequence: u32, revoked: bool) -> Self {
        Self {
            keys,
            token_sequence,
            revoked,
            domain: None,
            manifest: Vec::new(),
            pending: PendingOperation::None,
        }
    }

    pub fn key_type(&self) -> KeyType {
        self.keys.public_key().key_type()
    }

    pub fn public_key(&self) -> &PublicKey {
        self.keys.public_key()
    }

    pub fn secret_key(&self) -> Option<&SecretKey> {
        self.keys.secret_key()
    }

    pub fn is_external(&self) -> bool {
        matches!(self.keys, KeyMaterial::External { .. })
    }

    pub fn token_sequence(&self) -> u32 {
        self.token_sequence
    }

    pub fn revoked(&self) -> bool {
        self.revoked
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn pending(&self) -> &PendingOperation {
        &self.pending
    }

    /// The last committed manifest, verified before it is handed out.
    pub fn manifest(&self) -> KeyResult<Option<&[u8]>> {
        if self.manifest.is_empty() {
            return Ok(None);
        }
        self.verify_manifest()?;
        Ok(Some(&self.manifest))
    }

    pub(crate) fn manifest_bytes(&self) -> &[u8] {
        &self.manifest
    }

    pub(crate) fn restore_domain(&mut self, domain: String) {
        self.domain = (!domain.is_empty()).then_some(domain);
    }

    pub(crate) fn restore_manifest(&mut self, manifest: Vec<u8>) {
        self.manifest = manifest;
    }

    pub(crate) fn restore_pending(&mut self, pending: PendingOperation) {
        self.pending = pending;
    }

    fn token_available(&self) -> bool {
        !self.revoked && self.token_sequence < SEQUENCE_MAX - 1
    }

    /// Mint a token signed by the local master key.
    ///
    /// Returns `Ok(None)` once the keys are revoked or the sequence space is
    /// used up.
    pub fn create_token(&mut self, key_type: KeyType) -> KeyResult<Option<ValidatorToken>> {
        if !self.token_available() {
            return Ok(None);
        }
        let signer = self.keys.signer().ok_or(KeyError::CannotSignTokens)?;

        let (token_secret, token_public) = crypto::generate_key_pair(key_type);
        let mut manifest = self.delegation(self.token_sequence + 1, token_public);
        let data = manifest.signing_data();
        manifest.signature = Some(crypto::sign(key_type, &token_secret, &data)?);
        manifest.master_signature = Some(signer.sign(&data)?);

        self.commit(&manifest)?;
        debug!(sequence = self.token_sequence, %key_type, "created validator token");
        Ok(Some(self.token(token_secret)))
    }

    /// Stage a token for external signing and return the pre-image the
    /// master key must sign. The sequence does not move until
    /// [`finish_token`](Self::finish_token).
    pub fn start_token(&mut self, key_type: KeyType) -> Option<Vec<u8>> {
        if !self.token_available() {
            return None;
        }

        let (secret_key, token_public) = crypto::generate_key_pair(key_type);
        let manifest = self.delegation(self.token_sequence + 1, token_public);
        self.pending = PendingOperation::Token {
            secret_key,
            key_type,
        };

        debug!(sequence = manifest.sequence, %key_type, "staged validator token");
        Some(manifest.signing_data())
    }

    /// Complete a staged token with the external master signature.
    pub fn finish_token(&mut self, master_signature: &[u8]) -> KeyResult<Option<ValidatorToken>> {
        if !self.token_available() {
            return Ok(None);
        }
        let PendingOperation::Token {
            secret_key,
            key_type,
        } = &self.pending
        else {
            return Err(KeyError::NoPendingToken);
        };
        let (token_secret, key_type) = (secret_key.clone(), *key_type);

        let token_public = crypto::derive_public_key(key_type, &token_secret)?;
        let mut manifest = self.delegation(self.token_sequence + 1, token_public);
        let data = manifest.signing_data();
        manifest.signature = Some(crypto::sign(key_type, &token_secret, &data)?);
        manifest.master_signature = Some(master_signature.to_vec());

        self.commit(&manifest)?;
        debug!(sequence = self.token_sequence, %key_type, "finished validator token");
        Ok(Some(self.token(token_secret)))
    }

    /// Revoke the master key with the local secret. Repeating it is fine.
    ///
    /// Returns the base64 revocation manifest.
    pub fn revoke(&mut self) -> KeyResult<String> {
        let signer = self.keys.signer().ok_or(KeyError::CannotSignTokens)?;

        let mut manifest = Manifest::revocation(*self.public_key());
        manifest.master_signature = Some(signer.sign(&manifest.signing_data())?);

        self.commit(&manifest)?;
        debug!("revoked master key");
        Ok(to_base64(&self.manifest))
    }

    /// Return the revocation pre-image for external signing. Drops any
    /// staged token; the keys are not revoked until
    /// [`finish_revoke`](Self::finish_revoke).
    pub fn start_revoke(&mut self) -> Vec<u8> {
        self.pending = PendingOperation::Revocation;
        debug!("staged revocation");
        Manifest::revocation(*self.public_key()).signing_data()
    }

    /// Revoke with an external master signature. Safe to repeat.
    pub fn finish_revoke(&mut self, master_signature: &[u8]) -> KeyResult<String> {
        let mut manifest = Manifest::revocation(*self.public_key());
        manifest.master_signature = Some(master_signature.to_vec());

        self.commit(&manifest)?;
        debug!("finished revocation");
        Ok(to_base64(&self.manifest))
    }

    /// Check the stored manifest against the master key and the current
    /// revocation state.
    pub fn verify_manifest(&self) -> KeyResult<()> {
        if self.manifest.is_empty() {
            return Err(KeyError::ManifestNotSigned);
        }
        let manifest = Manifest::parse(&self.manifest)?;

        let expected = if self.revoked {
            ManifestKind::Revocation
        } else {
            ManifestKind::Delegation
        };
        let consistent = manifest.master_public_key == *self.public_key()
            && manifest.kind() == Some(expected)
            && (self.revoked || manifest.sequence == self.token_sequence);

        if !consistent || !manifest.verify() {
            return Err(KeyError::ManifestNotSigned);
        }
        Ok(())
    }

    /// Set the domain carried by future tokens; empty clears it.
    ///
    /// A staged token carried the old domain, so changing it drops the stage.
    pub fn set_domain(&mut self, domain: &str) -> KeyResult<()> {
        validate_domain(domain)?;

        if self.domain() != (!domain.is_empty()).then_some(domain) {
            if matches!(self.pending, PendingOperation::Token { .. }) {
                self.pending = PendingOperation::None;
            }
            self.restore_domain(domain.to_string());
            debug!(domain, "domain changed");
        }
        Ok(())
    }

    /// Sign arbitrary data with the master key.
    pub fn sign(&self, data: impl AsRef<[u8]>) -> KeyResult<Vec<u8>> {
        let signer = self.keys.signer().ok_or(KeyError::CannotSign)?;
        signer.sign(data.as_ref())
    }

    /// Decode hex and sign the bytes with the master key.
    pub fn sign_hex(&self, data: &str) -> KeyResult<Vec<u8>> {
        if self.keys.signer().is_none() {
            return Err(KeyError::CannotSign);
        }
        let data = data.trim();
        let bytes = from_hex(data).ok_or_else(|| KeyError::InvalidHex {
            value: data.to_string(),
        })?;
        self.sign(bytes)
    }

    fn delegation(&self, sequence: u32, token_public: PublicKey) -> Manifest {
        Manifest::delegation(
            sequence,
            *self.public_key(),
            token_public,
            self.domain().unwrap_or_default(),
        )
    }

    fn token(&self, secret_key: SecretKey) -> ValidatorToken {
        ValidatorToken {
            manifest: to_base64(&self.manifest),
            secret_key,
        }
    }

    // Verifies first; nothing changes unless the manifest checks out.
    fn commit(&mut self, manifest: &Manifest) -> KeyResult<()> {
        if manifest.master_public_key != *self.public_key() || !manifest.verify() {
            return Err(KeyError::ManifestNotSigned);
        }

        if manifest.kind() == Some(ManifestKind::Revocation) {
            self.revoked = true;
        } else {
            self.token_sequence = manifest.sequence;
        }
        self.manifest = manifest.serialize();
        self.pending = PendingOperation::None;
        Ok(())
    }
}
