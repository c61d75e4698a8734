//! Validator key management.
//!
//! A validator keeps one long-lived master key and delegates day-to-day
//! signing to ephemeral keys through signed manifests ("tokens"). Each new
//! token carries a higher sequence number; revoking the master key publishes
//! a manifest at the highest sequence so no later token can supersede it.
//!
//! The master secret can stay off the host entirely: key files created from
//! a public key alone stage tokens and revocations, and finish them with a
//! signature produced on the signing device.
//!
//! # Quick start
//!
//! ```no_run
//! use validator_keys_core::{KeyType, ValidatorKeys};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut keys = ValidatorKeys::new(KeyType::Ed25519);
//! keys.set_domain("validator.example.com")?;
//!
//! if let Some(token) = keys.create_token(KeyType::Secp256k1)? {
//!     println!("[validator_token]\n{}", token.encode());
//! }
//! keys.save("validator-keys.json")?;
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod domain;
pub mod encoding;
pub mod error;
pub mod keyfile;
pub mod keys;
pub mod manifest;

pub use crypto::{KeyType, PublicKey, SecretKey};
pub use domain::validate_domain;
pub use error::{KeyError, KeyResult};
pub use keyfile::EXTERNAL_SECRET;
pub use keys::{KeyMaterial, PendingOperation, ValidatorKeys, ValidatorToken};
pub use manifest::{Manifest, ManifestKind, MANIFEST_PREFIX, SEQUENCE_MAX};
