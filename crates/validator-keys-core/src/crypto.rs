//! Key types and the two signature algorithms.
//!
//! Public keys are 33 bytes in both algorithms so the algorithm can be read
//! back from the key itself:
//!
//! ```text
//! secp256k1: 0x02|0x03 || x-coordinate (compressed point)
//! ed25519:   0xED      || 32-byte ed25519 public key
//! ```
//!
//! ed25519 signs the message as given. secp256k1 signs the first half of
//! SHA-512 over the message and emits DER-encoded, low-S ECDSA signatures.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{KeyError, KeyResult};

/// Length of a serialized public key.
pub const PUBLIC_KEY_LEN: usize = 33;

/// Length of a secret key.
pub const SECRET_KEY_LEN: usize = 32;

const ED25519_PREFIX: u8 = 0xED;

/// Signature algorithm of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Secp256k1,
    Ed25519,
}

impl KeyType {
    pub const ALL: [KeyType; 2] = [KeyType::Secp256k1, KeyType::Ed25519];

    /// Name used in key files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Secp256k1 => "secp256k1",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secp256k1" => Ok(Self::Secp256k1),
            "ed25519" => Ok(Self::Ed25519),
            _ => Err(KeyError::UnknownKeyType {
                value: s.to_string(),
            }),
        }
    }
}

/// A validated public key of either algorithm.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Parse a serialized public key, rejecting points that are not on the curve.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; PUBLIC_KEY_LEN] = bytes.try_into().ok()?;
        let valid = match bytes[0] {
            ED25519_PREFIX => VerifyingKey::from_bytes(&ed25519_body(&bytes)).is_ok(),
            0x02 | 0x03 => secp256k1::PublicKey::from_slice(&bytes).is_ok(),
            _ => false,
        };
        valid.then_some(Self(bytes))
    }

    pub fn key_type(&self) -> KeyType {
        if self.0[0] == ED25519_PREFIX {
            KeyType::Ed25519
        } else {
            KeyType::Secp256k1
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn from_ed25519(key: &VerifyingKey) -> Self {
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes[0] = ED25519_PREFIX;
        bytes[1..].copy_from_slice(key.as_bytes());
        Self(bytes)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode_upper(self.0))
    }
}

/// A 32-byte secret key. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; SECRET_KEY_LEN]);

impl SecretKey {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

fn ed25519_body(bytes: &[u8; PUBLIC_KEY_LEN]) -> [u8; 32] {
    let mut body = [0u8; 32];
    body.copy_from_slice(&bytes[1..]);
    body
}

fn secp256k1_secret(secret: &SecretKey) -> KeyResult<secp256k1::SecretKey> {
    secp256k1::SecretKey::from_slice(&secret.0).map_err(|_| KeyError::InvalidSecretKey {
        key_type: KeyType::Secp256k1,
    })
}

/// First half of SHA-512.
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(data);
    let mut half = [0u8; 32];
    half.copy_from_slice(&digest.as_slice()[..32]);
    half
}

/// Generate a fresh random key pair.
pub fn generate_key_pair(key_type: KeyType) -> (SecretKey, PublicKey) {
    match key_type {
        KeyType::Ed25519 => {
            let signing_key = SigningKey::generate(&mut rand::thread_rng());
            let public_key = PublicKey::from_ed25519(&signing_key.verifying_key());
            (SecretKey(signing_key.to_bytes()), public_key)
        }
        KeyType::Secp256k1 => {
            let secret_key = secp256k1::SecretKey::new(&mut secp256k1::rand::thread_rng());
            let public_key = secp256k1::PublicKey::from_secret_key_global(&secret_key);
            (
                SecretKey(secret_key.secret_bytes()),
                PublicKey(public_key.serialize()),
            )
        }
    }
}

/// Derive the public key belonging to `secret`.
pub fn derive_public_key(key_type: KeyType, secret: &SecretKey) -> KeyResult<PublicKey> {
    match key_type {
        KeyType::Ed25519 => Ok(PublicKey::from_ed25519(
            &SigningKey::from_bytes(&secret.0).verifying_key(),
        )),
        KeyType::Secp256k1 => {
            let secret_key = secp256k1_secret(secret)?;
            Ok(PublicKey(
                secp256k1::PublicKey::from_secret_key_global(&secret_key).serialize(),
            ))
        }
    }
}

/// Sign `message` with `secret`.
pub fn sign(key_type: KeyType, secret: &SecretKey, message: &[u8]) -> KeyResult<Vec<u8>> {
    match key_type {
        KeyType::Ed25519 => {
            let signing_key = SigningKey::from_bytes(&secret.0);
            Ok(signing_key.sign(message).to_bytes().to_vec())
        }
        KeyType::Secp256k1 => {
            let secret_key = secp256k1_secret(secret)?;
            let digest = secp256k1::Message::from_digest(sha512_half(message));
            let signature = secp256k1::SECP256K1.sign_ecdsa(&digest, &secret_key);
            Ok(signature.serialize_der().to_vec())
        }
    }
}

/// Check `signature` over `message` against `public_key`.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    match public_key.key_type() {
        KeyType::Ed25519 => {
            let Ok(key) = VerifyingKey::from_bytes(&ed25519_body(&public_key.0)) else {
                return false;
            };
            let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
                return false;
            };
            key.verify(message, &signature).is_ok()
        }
        KeyType::Secp256k1 => {
            let Ok(key) = secp256k1::PublicKey::from_slice(&public_key.0) else {
                return false;
            };
            let Ok(signature) = secp256k1::ecdsa::Signature::from_der(signature) else {
                return false;
            };
            let digest = secp256k1::Message::from_digest(sha512_half(message));
            secp256k1::SECP256K1
                .verify_ecdsa(&digest, &signature, &key)
                .is_ok()
        }
    }
}
