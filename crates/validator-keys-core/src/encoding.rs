//! Text encodings for keys, signatures and manifests.
//!
//! Keys are written as base58-check strings over the Ripple alphabet with a
//! one-byte token type; manifests and signatures travel as hex or base64.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::crypto::{PublicKey, SecretKey};
use crate::error::{KeyError, KeyResult};

/// Version byte of a base58 token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenType {
    NodePublic = 28,
    NodePrivate = 32,
}

pub fn to_base58(token_type: TokenType, bytes: &[u8]) -> String {
    let mut payload = Vec::with_capacity(bytes.len() + 1);
    payload.push(token_type as u8);
    payload.extend_from_slice(bytes);
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check()
        .into_string()
}

/// Decode a base58-check token, returning its body if the checksum and
/// token type match.
pub fn from_base58(token_type: TokenType, text: &str) -> Option<Vec<u8>> {
    let decoded = bs58::decode(text)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(None)
        .into_vec()
        .ok()?;
    let (version, body) = decoded.split_first()?;
    (*version == token_type as u8).then(|| body.to_vec())
}

/// Uppercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    hex::decode(text).ok()
}

pub fn to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Strict base64: the decoded bytes must re-encode to exactly `text`.
pub fn from_base64(text: &str) -> Option<Vec<u8>> {
    let bytes = BASE64.decode(text).ok()?;
    (BASE64.encode(&bytes) == text).then_some(bytes)
}

pub fn encode_node_public(key: &PublicKey) -> String {
    to_base58(TokenType::NodePublic, key.as_bytes())
}

pub fn decode_node_public(text: &str) -> Option<PublicKey> {
    from_base58(TokenType::NodePublic, text).and_then(|bytes| PublicKey::from_slice(&bytes))
}

pub fn encode_node_private(key: &SecretKey) -> String {
    to_base58(TokenType::NodePrivate, key.as_bytes())
}

pub fn decode_node_private(text: &str) -> Option<SecretKey> {
    from_base58(TokenType::NodePrivate, text).and_then(|bytes| SecretKey::from_slice(&bytes))
}

/// Parse an operator-supplied public key in base58, hex or base64.
pub fn parse_public_key(text: &str) -> KeyResult<PublicKey> {
    let text = text.trim();
    decode_node_public(text)
        .or_else(|| from_hex(text).and_then(|bytes| PublicKey::from_slice(&bytes)))
        .or_else(|| from_base64(text).and_then(|bytes| PublicKey::from_slice(&bytes)))
        .ok_or_else(|| KeyError::InvalidPublicKey {
            value: text.to_string(),
        })
}

/// Parse an externally produced master signature in hex or base64.
pub fn parse_master_signature(text: &str) -> KeyResult<Vec<u8>> {
    let text = text.trim();
    from_hex(text)
        .or_else(|| from_base64(text))
        .filter(|bytes| !bytes.is_empty())
        .ok_or(KeyError::InvalidMasterSignature)
}
