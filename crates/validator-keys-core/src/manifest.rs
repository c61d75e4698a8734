//! Manifest records and their canonical binary encoding.
//!
//! A manifest is a flat list of tagged fields sorted by `(type, field)` code:
//!
//! ```text
//! 0x24          sequence          u32 big-endian
//! 0x71  VL      master public key
//! 0x73  VL      signing public key  (delegation only)
//! 0x76  VL      signature           (delegation only, not signed)
//! 0x77  VL      domain              (optional)
//! 0x70 0x12 VL  master signature    (not signed)
//! ```
//!
//! Both signatures cover `MAN\0 || fields without the two signature fields`.

use crate::crypto::{self, PublicKey};
use crate::error::{KeyError, KeyResult};

/// Sequence reserved for revocations. Delegations must stay below it.
pub const SEQUENCE_MAX: u32 = u32::MAX;

/// Domain tag prepended to every signed manifest pre-image.
pub const MANIFEST_PREFIX: [u8; 4] = *b"MAN\0";

const TYPE_UINT32: u8 = 2;
const TYPE_BLOB: u8 = 7;

/// Largest length a VL prefix can describe.
const VL_MAX: usize = 918_744;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Field {
    Sequence,
    PublicKey,
    SigningPubKey,
    Signature,
    Domain,
    MasterSignature,
}

impl Field {
    fn code(self) -> (u8, u8) {
        match self {
            Self::Sequence => (TYPE_UINT32, 4),
            Self::PublicKey => (TYPE_BLOB, 1),
            Self::SigningPubKey => (TYPE_BLOB, 3),
            Self::Signature => (TYPE_BLOB, 6),
            Self::Domain => (TYPE_BLOB, 7),
            Self::MasterSignature => (TYPE_BLOB, 18),
        }
    }

    fn from_code(type_code: u8, field_code: u8) -> Option<Self> {
        match (type_code, field_code) {
            (TYPE_UINT32, 4) => Some(Self::Sequence),
            (TYPE_BLOB, 1) => Some(Self::PublicKey),
            (TYPE_BLOB, 3) => Some(Self::SigningPubKey),
            (TYPE_BLOB, 6) => Some(Self::Signature),
            (TYPE_BLOB, 7) => Some(Self::Domain),
            (TYPE_BLOB, 18) => Some(Self::MasterSignature),
            _ => None,
        }
    }

    fn is_signing(self) -> bool {
        !matches!(self, Self::Signature | Self::MasterSignature)
    }
}

/// The two record kinds a well-formed manifest can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// Hands signing authority to an ephemeral key.
    Delegation,
    /// Retires the master key for good.
    Revocation,
}

/// A decoded manifest, signed or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub sequence: u32,
    pub master_public_key: PublicKey,
    pub signing_public_key: Option<PublicKey>,
    pub signature: Option<Vec<u8>>,
    pub domain: Option<String>,
    pub master_signature: Option<Vec<u8>>,
}

impl Manifest {
    /// Unsigned delegation record. An empty `domain` is left out.
    pub fn delegation(
        sequence: u32,
        master_public_key: PublicKey,
        signing_public_key: PublicKey,
        domain: &str,
    ) -> Self {
        Self {
            sequence,
            master_public_key,
            signing_public_key: Some(signing_public_key),
            signature: None,
            domain: (!domain.is_empty()).then(|| domain.to_string()),
            master_signature: None,
        }
    }

    /// Unsigned revocation record at [`SEQUENCE_MAX`].
    pub fn revocation(master_public_key: PublicKey) -> Self {
        Self {
            sequence: SEQUENCE_MAX,
            master_public_key,
            signing_public_key: None,
            signature: None,
            domain: None,
            master_signature: None,
        }
    }

    /// Full encoding, signatures included.
    pub fn serialize(&self) -> Vec<u8> {
        self.encode(true)
    }

    /// Encoding without the signature fields.
    pub fn serialize_unsigned(&self) -> Vec<u8> {
        self.encode(false)
    }

    /// The bytes both the ephemeral and the master key sign.
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = MANIFEST_PREFIX.to_vec();
        data.extend(self.serialize_unsigned());
        data
    }

    /// Record kind implied by which fields are present, or `None` if the
    /// combination is neither a delegation nor a revocation.
    pub fn kind(&self) -> Option<ManifestKind> {
        let has_signing_key = self.signing_public_key.is_some();
        let has_signature = self.signature.is_some();
        if self.master_signature.is_none() {
            return None;
        }

        match (self.sequence == SEQUENCE_MAX, has_signing_key, has_signature) {
            (true, false, false) => Some(ManifestKind::Revocation),
            (false, true, true) => Some(ManifestKind::Delegation),
            _ => None,
        }
    }

    /// Check every signature the record kind calls for.
    pub fn verify(&self) -> bool {
        let Some(kind) = self.kind() else {
            return false;
        };
        let data = self.signing_data();

        if kind == ManifestKind::Delegation {
            let (Some(signing_key), Some(signature)) = (&self.signing_public_key, &self.signature)
            else {
                return false;
            };
            if !crypto::verify(signing_key, &data, signature) {
                return false;
            }
        }

        self.master_signature
            .as_deref()
            .is_some_and(|signature| crypto::verify(&self.master_public_key, &data, signature))
    }

    /// Decode a manifest, rejecting anything that is not in canonical form.
    pub fn parse(bytes: &[u8]) -> KeyResult<Self> {
        let mut reader = Reader { bytes, pos: 0 };
        let mut previous: Option<Field> = None;

        let mut sequence = None;
        let mut master_public_key = None;
        let mut signing_public_key = None;
        let mut signature = None;
        let mut domain = None;
        let mut master_signature = None;

        while !reader.is_empty() {
            let field = reader.field()?;
            if previous.is_some_and(|prev| field <= prev) {
                return Err(malformed("duplicate or out-of-order field"));
            }
            previous = Some(field);

            match field {
                Field::Sequence => {
                    let mut buf = [0u8; 4];
                    buf.copy_from_slice(reader.take(4)?);
                    sequence = Some(u32::from_be_bytes(buf));
                }
                Field::PublicKey => master_public_key = Some(public_key(reader.blob()?)?),
                Field::SigningPubKey => signing_public_key = Some(public_key(reader.blob()?)?),
                Field::Signature => signature = Some(reader.blob()?.to_vec()),
                Field::Domain => {
                    let text = std::str::from_utf8(reader.blob()?)
                        .map_err(|_| malformed("domain is not valid UTF-8"))?;
                    domain = Some(text.to_string());
                }
                Field::MasterSignature => master_signature = Some(reader.blob()?.to_vec()),
            }
        }

        Ok(Self {
            sequence: sequence.ok_or_else(|| malformed("missing sequence"))?,
            master_public_key: master_public_key
                .ok_or_else(|| malformed("missing master public key"))?,
            signing_public_key,
            signature,
            domain,
            master_signature,
        })
    }

    fn encode(&self, with_signatures: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        let mut put = |field: Field, value: &[u8]| {
            if !with_signatures && !field.is_signing() {
                return;
            }
            write_field_header(&mut out, field);
            if field == Field::Sequence {
                out.extend_from_slice(value);
            } else {
                write_vl(&mut out, value.len());
                out.extend_from_slice(value);
            }
        };

        put(Field::Sequence, &self.sequence.to_be_bytes());
        put(Field::PublicKey, self.master_public_key.as_bytes());
        if let Some(key) = &self.signing_public_key {
            put(Field::SigningPubKey, key.as_bytes());
        }
        if let Some(signature) = &self.signature {
            put(Field::Signature, signature);
        }
        if let Some(domain) = &self.domain {
            put(Field::Domain, domain.as_bytes());
        }
        if let Some(signature) = &self.master_signature {
            put(Field::MasterSignature, signature);
        }
        out
    }
}

fn malformed(reason: &str) -> KeyError {
    KeyError::MalformedManifest {
        reason: reason.to_string(),
    }
}

fn public_key(bytes: &[u8]) -> KeyResult<PublicKey> {
    PublicKey::from_slice(bytes).ok_or_else(|| malformed("invalid public key"))
}

fn write_field_header(out: &mut Vec<u8>, field: Field) {
    let (type_code, field_code) = field.code();
    match (type_code < 16, field_code < 16) {
        (true, true) => out.push((type_code << 4) | field_code),
        (true, false) => out.extend([type_code << 4, field_code]),
        (false, true) => out.extend([field_code, type_code]),
        (false, false) => out.extend([0, type_code, field_code]),
    }
}

fn write_vl(out: &mut Vec<u8>, len: usize) {
    debug_assert!(len <= VL_MAX, "field too long for a VL prefix");
    if len <= 192 {
        out.push(len as u8);
    } else if len <= 12_480 {
        let len = len - 193;
        out.extend([193 + (len >> 8) as u8, (len & 0xff) as u8]);
    } else {
        let len = len - 12_481;
        out.extend([
            241 + (len >> 16) as u8,
            ((len >> 8) & 0xff) as u8,
            (len & 0xff) as u8,
        ]);
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> KeyResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| malformed("truncated field"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> KeyResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn field(&mut self) -> KeyResult<Field> {
        let header = self.byte()?;
        let mut type_code = header >> 4;
        let mut field_code = header & 0x0f;

        if type_code == 0 {
            type_code = self.byte()?;
            if type_code < 16 {
                return Err(malformed("non-canonical field header"));
            }
        }
        if field_code == 0 {
            field_code = self.byte()?;
            if field_code < 16 {
                return Err(malformed("non-canonical field header"));
            }
        }

        Field::from_code(type_code, field_code).ok_or_else(|| malformed("unknown field"))
    }

    fn vl_len(&mut self) -> KeyResult<usize> {
        let b1 = usize::from(self.byte()?);
        match b1 {
            0..=192 => Ok(b1),
            193..=240 => {
                let b2 = usize::from(self.byte()?);
                Ok(193 + ((b1 - 193) << 8) + b2)
            }
            241..=254 => {
                let b2 = usize::from(self.byte()?);
                let b3 = usize::from(self.byte()?);
                Ok(12_481 + ((b1 - 241) << 16) + (b2 << 8) + b3)
            }
            _ => Err(malformed("invalid length prefix")),
        }
    }

    fn blob(&mut self) -> KeyResult<&'a [u8]> {
        let len = self.vl_len()?;
        self.take(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{generate_key_pair, sign, KeyType};
    use proptest::prelude::*;

    fn signed_delegation(domain: &str) -> Manifest {
        let (master_secret, master) = generate_key_pair(KeyType::Ed25519);
        let (token_secret, token) = generate_key_pair(KeyType::Secp256k1);

        let mut manifest = Manifest::delegation(1, master, token, domain);
        let data = manifest.signing_data();
        manifest.signature = Some(sign(KeyType::Secp256k1, &token_secret, &data).unwrap());
        manifest.master_signature = Some(sign(KeyType::Ed25519, &master_secret, &data).unwrap());
        manifest
    }

    #[test]
    fn test_field_header_forms() {
        let mut out = Vec::new();
        write_field_header(&mut out, Field::Sequence);
        assert_eq!(out, [0x24]);

        out.clear();
        write_field_header(&mut out, Field::MasterSignature);
        assert_eq!(out, [0x70, 0x12]);
    }

    #[test]
    fn test_vl_length_boundaries() {
        for len in [0, 1, 192, 193, 12_480, 12_481, VL_MAX] {
            let mut out = Vec::new();
            write_vl(&mut out, len);
            let expected_prefix = match len {
                0..=192 => 1,
                193..=12_480 => 2,
                _ => 3,
            };
            assert_eq!(out.len(), expected_prefix, "prefix size for {len}");

            let mut reader = Reader {
                bytes: &out,
                pos: 0,
            };
            assert_eq!(reader.vl_len().unwrap(), len);
        }
    }

    #[test]
    fn test_delegation_layout_and_parse() {
        let manifest = signed_delegation("example.com");
        let bytes = manifest.serialize();

        assert_eq!(bytes[0], 0x24);
        assert_eq!(&bytes[1..5], &1u32.to_be_bytes());
        assert_eq!(&bytes[5..7], &[0x71, 33]);

        let parsed = Manifest::parse(&bytes).unwrap();
        assert_eq!(parsed, manifest);
        assert_eq!(parsed.kind(), Some(ManifestKind::Delegation));
        assert!(parsed.verify());
    }

    #[test]
    fn test_signing_data_excludes_signatures() {
        let manifest = signed_delegation("");
        let mut unsigned = manifest.clone();
        unsigned.signature = None;
        unsigned.master_signature = None;

        assert_eq!(manifest.signing_data(), unsigned.signing_data());
        assert!(manifest.signing_data().starts_with(b"MAN\0"));
        assert!(manifest.domain.is_none());
    }

    #[test]
    fn test_revocation_needs_only_master_signature() {
        let (secret, master) = generate_key_pair(KeyType::Secp256k1);
        let mut revocation = Manifest::revocation(master);
        assert_eq!(revocation.kind(), None);

        let data = revocation.signing_data();
        revocation.master_signature = Some(sign(KeyType::Secp256k1, &secret, &data).unwrap());
        assert_eq!(revocation.kind(), Some(ManifestKind::Revocation));
        assert!(revocation.verify());

        let parsed = Manifest::parse(&revocation.serialize()).unwrap();
        assert_eq!(parsed.sequence, SEQUENCE_MAX);
        assert!(parsed.signature.is_none());
        assert!(parsed.verify());

        // A delegated signature turns it into neither kind
        revocation.signature = Some(vec![1, 2, 3]);
        assert_eq!(revocation.kind(), None);
        assert!(!revocation.verify());
    }

    #[test]
    fn test_tampered_signatures_fail() {
        let manifest = signed_delegation("example.com");

        let mut tampered = manifest.clone();
        if let Some(signature) = tampered.master_signature.as_mut() {
            signature[10] ^= 0x01;
        }
        assert!(!tampered.verify());

        let mut tampered = manifest.clone();
        tampered.domain = Some("example.org".to_string());
        assert!(!tampered.verify());

        let mut tampered = manifest;
        tampered.sequence = 2;
        assert!(!tampered.verify());
    }

    #[test]
    fn test_parse_rejects_non_canonical_input() {
        let bytes = signed_delegation("example.com").serialize();

        let err = Manifest::parse(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.to_string(), "malformed manifest: truncated field");

        let mut duplicated = bytes[..5].to_vec();
        duplicated.extend_from_slice(&bytes);
        assert!(Manifest::parse(&duplicated).is_err());

        let mut reordered = bytes[5..].to_vec();
        reordered.extend_from_slice(&bytes[..5]);
        assert!(Manifest::parse(&reordered).is_err());

        let mut unknown = bytes.clone();
        unknown.extend_from_slice(&[0x7F, 0x00]);
        let err = Manifest::parse(&unknown).unwrap_err();
        assert_eq!(err.to_string(), "malformed manifest: unknown field");

        assert!(Manifest::parse(&[]).is_err());
        assert!(Manifest::parse(&[0x24, 0, 0, 0, 1]).is_err());
    }

    #[test]
    fn test_parse_rejects_invalid_public_key() {
        let mut bytes = vec![0x24, 0, 0, 0, 1, 0x71, 33];
        bytes.extend_from_slice(&[0x05; 33]);
        let err = Manifest::parse(&bytes).unwrap_err();
        assert_eq!(err.to_string(), "malformed manifest: invalid public key");
    }

    proptest! {
        #[test]
        fn parse_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = Manifest::parse(&bytes);
        }
    }
}
