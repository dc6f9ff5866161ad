//! Canonical content descriptor
//!
//! An [`Envelope`] never carries the content it describes. It commits to it
//! through `SHA256(content ‖ nonce)` and records its length, a type tag and
//! claim metadata. Its canonical serialization is the exact byte string peer
//! signatures are computed over, so the JSON field order below is part of
//! the protocol:
//!
//! `Version, ContentHash, ContentLength, ContentNonce, ContentHashAlgorithm,
//! EnvelopeType, EnvelopeSubType, TimeStamp, AdditionalInfo`

use std::{fmt, io::Read};

use notarius_crypto::{random_bytes, Sha256State, HASH_ALGORITHM_SHA256};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::{
    clock::{Clock, SystemClock},
    error::{CoreError, Result},
    value::{validate_claim_map, ClaimMap},
    wire,
};

pub const ENVELOPE_VERSION: u32 = 1;

/// Nonce length used when issuing
pub const NONCE_LENGTH: usize = 32;
/// Shortest nonce accepted on receipt
pub const MIN_NONCE_LENGTH: usize = 16;
/// Longest nonce accepted on receipt
pub const MAX_NONCE_LENGTH: usize = 32;

const CONTENT_HASH_LENGTH: usize = 32;
const READ_CHUNK: usize = 8 * 1024;

/// What an envelope is for; verifiers must check it against the expected use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeType {
    Attestation,
    Request,
    Document,
    Contract,
    Instruction,
}

impl EnvelopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeType::Attestation => "attestation",
            EnvelopeType::Request => "request",
            EnvelopeType::Document => "document",
            EnvelopeType::Contract => "contract",
            EnvelopeType::Instruction => "instruction",
        }
    }
}

impl fmt::Display for EnvelopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnvelopeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "attestation" => Ok(EnvelopeType::Attestation),
            "request" => Ok(EnvelopeType::Request),
            "document" => Ok(EnvelopeType::Document),
            "contract" => Ok(EnvelopeType::Contract),
            "instruction" => Ok(EnvelopeType::Instruction),
            other => Err(CoreError::InvalidEnvelope(format!(
                "unknown envelope type '{other}'"
            ))),
        }
    }
}

/// Refinement of [`EnvelopeType`].
///
/// Instructions use the fixed tags below; other envelope types may carry any
/// non-empty tag (an attestation carries its claim key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvelopeSubType(String);

impl EnvelopeSubType {
    pub const ATTESTATION: &'static str = "attestation";
    pub const KEY_REGISTRATION: &'static str = "key registration";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn attestation() -> Self {
        Self::new(Self::ATTESTATION)
    }

    pub fn key_registration() -> Self {
        Self::new(Self::KEY_REGISTRATION)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvelopeSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnvelopeSubType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Content descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    version: u32,
    #[serde(
        default,
        with = "wire::b64_opt",
        skip_serializing_if = "Option::is_none"
    )]
    content_hash: Option<Vec<u8>>,
    #[serde(default)]
    content_length: u64,
    #[serde(
        default,
        with = "wire::b64_opt",
        skip_serializing_if = "Option::is_none"
    )]
    content_nonce: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_hash_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    envelope_type: Option<EnvelopeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    envelope_sub_type: Option<EnvelopeSubType>,
    #[serde(default)]
    time_stamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    additional_info: Option<ClaimMap>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            version: ENVELOPE_VERSION,
            content_hash: None,
            content_length: 0,
            content_nonce: None,
            content_hash_algorithm: None,
            envelope_type: None,
            envelope_sub_type: None,
            time_stamp: 0,
            additional_info: None,
        }
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Envelope {
    /// An empty descriptor; call one of the `compute_digest*` methods next
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a descriptor over `content` in one step
    pub fn for_content(
        content: &[u8],
        envelope_type: EnvelopeType,
        sub_type: impl Into<EnvelopeSubType>,
    ) -> Result<Self> {
        let mut envelope = Self::new();
        envelope.compute_digest(content, envelope_type, sub_type)?;
        Ok(envelope)
    }

    /// Commit to `content`, stamped with the current time.
    ///
    /// Draws a fresh 32-byte nonce and records `SHA256(content ‖ nonce)`
    /// together with the content length. Fails on empty content or when a
    /// digest is already present.
    pub fn compute_digest(
        &mut self,
        content: &[u8],
        envelope_type: EnvelopeType,
        sub_type: impl Into<EnvelopeSubType>,
    ) -> Result<()> {
        self.compute_digest_at(content, envelope_type, sub_type, SystemClock.now_millis())
    }

    /// As [`compute_digest`](Self::compute_digest) with an explicit timestamp
    pub fn compute_digest_at(
        &mut self,
        content: &[u8],
        envelope_type: EnvelopeType,
        sub_type: impl Into<EnvelopeSubType>,
        timestamp_ms: i64,
    ) -> Result<()> {
        self.compute_digest_from_reader(content, envelope_type, sub_type, timestamp_ms)
    }

    /// Commit to content read from a stream.
    ///
    /// Length and hash come from the same pass over the stream. Nothing on
    /// `self` changes unless the whole stream was read and hashed.
    pub fn compute_digest_from_reader<R: Read>(
        &mut self,
        mut reader: R,
        envelope_type: EnvelopeType,
        sub_type: impl Into<EnvelopeSubType>,
        timestamp_ms: i64,
    ) -> Result<()> {
        if self.content_hash.is_some() || self.content_nonce.is_some() {
            return Err(CoreError::DigestAlreadySet);
        }

        let nonce = random_bytes(NONCE_LENGTH)?;
        let mut state = Sha256State::new();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            state.update(&buf[..n]);
        }

        let content_length = state.length();
        if content_length == 0 {
            return Err(CoreError::EmptyContent);
        }
        state.update(&nonce);

        self.content_hash = Some(state.finalize().to_vec());
        self.content_length = content_length;
        self.content_nonce = Some(nonce);
        self.content_hash_algorithm = Some(HASH_ALGORITHM_SHA256.to_string());
        self.envelope_type = Some(envelope_type);
        self.envelope_sub_type = Some(sub_type.into());
        self.time_stamp = timestamp_ms;
        Ok(())
    }

    /// Attach claim metadata. Allowed once, and only with a non-empty map of
    /// finite values.
    pub fn set_claim_data(&mut self, additional_info: ClaimMap) -> Result<()> {
        if self.additional_info.is_some() {
            return Err(CoreError::ClaimDataAlreadySet);
        }
        if additional_info.is_empty() {
            return Err(CoreError::EmptyClaimData);
        }
        validate_claim_map(&additional_info)?;
        self.additional_info = Some(additional_info);
        Ok(())
    }
}

// ============================================================================
// Serialization & checks
// ============================================================================

impl Envelope {
    /// The byte string peer signatures cover
    pub fn canonical_serialize(&self) -> Result<Vec<u8>> {
        if self.content_hash.is_none() {
            return Err(CoreError::MissingDigest);
        }
        Ok(serde_json::to_vec(self)?)
    }

    /// Does `content` hash, under this envelope's nonce, to its digest?
    pub fn matches_content(&self, content: &[u8]) -> bool {
        let (Some(hash), Some(nonce)) = (&self.content_hash, &self.content_nonce) else {
            return false;
        };
        if content.len() as u64 != self.content_length {
            return false;
        }
        let mut state = Sha256State::new();
        state.update(content);
        state.update(nonce);
        state.finalize()[..].ct_eq(hash).into()
    }

    /// Shape checks applied to envelopes received from elsewhere.
    ///
    /// Receivers accept any nonce of 16..=32 bytes even though issuance
    /// always uses 32.
    pub fn validate_structure(&self) -> Result<()> {
        let invalid = |reason: String| Err(CoreError::InvalidEnvelope(reason));

        if self.version != ENVELOPE_VERSION {
            return invalid(format!("unsupported envelope version {}", self.version));
        }
        match &self.content_hash {
            Some(hash) if hash.len() == CONTENT_HASH_LENGTH => {}
            Some(hash) => return invalid(format!("content hash is {} bytes", hash.len())),
            None => return invalid("missing content hash".to_string()),
        }
        match self.content_hash_algorithm.as_deref() {
            Some(HASH_ALGORITHM_SHA256) => {}
            other => return invalid(format!("unsupported content hash algorithm {other:?}")),
        }
        match &self.content_nonce {
            Some(nonce) if (MIN_NONCE_LENGTH..=MAX_NONCE_LENGTH).contains(&nonce.len()) => {}
            Some(nonce) => return invalid(format!("content nonce is {} bytes", nonce.len())),
            None => return invalid("missing content nonce".to_string()),
        }
        if self.content_length == 0 {
            return invalid("content length is zero".to_string());
        }
        if self.envelope_type.is_none() {
            return invalid("missing envelope type".to_string());
        }
        if let Some(info) = &self.additional_info {
            validate_claim_map(info)?;
        }
        Ok(())
    }

    /// Fail unless this envelope has the given type and subtype
    pub fn expect_type(&self, expected: EnvelopeType, sub_type: &str) -> Result<()> {
        match self.envelope_type {
            Some(actual) if actual == expected => {}
            actual => {
                return Err(CoreError::WrongEnvelopeType {
                    expected: expected.to_string(),
                    actual: actual.map(|t| t.to_string()).unwrap_or_default(),
                })
            }
        }
        match &self.envelope_sub_type {
            Some(actual) if actual.as_str() == sub_type => Ok(()),
            actual => Err(CoreError::WrongEnvelopeSubType {
                expected: sub_type.to_string(),
                actual: actual.as_ref().map(|t| t.to_string()).unwrap_or_default(),
            }),
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Envelope {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn content_hash(&self) -> Option<&[u8]> {
        self.content_hash.as_deref()
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn content_nonce(&self) -> Option<&[u8]> {
        self.content_nonce.as_deref()
    }

    pub fn content_hash_algorithm(&self) -> Option<&str> {
        self.content_hash_algorithm.as_deref()
    }

    pub fn envelope_type(&self) -> Option<EnvelopeType> {
        self.envelope_type
    }

    pub fn envelope_sub_type(&self) -> Option<&EnvelopeSubType> {
        self.envelope_sub_type.as_ref()
    }

    /// Creation time, milliseconds since the Unix epoch
    pub fn time_stamp(&self) -> i64 {
        self.time_stamp
    }

    pub fn additional_info(&self) -> Option<&ClaimMap> {
        self.additional_info.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ClaimValue;

    fn claims(pairs: &[(&str, ClaimValue)]) -> ClaimMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_compute_digest() {
        let mut envelope = Envelope::new();
        envelope
            .compute_digest_at(b"hello world", EnvelopeType::Document, "pdf", 1_000)
            .unwrap();

        assert_eq!(envelope.content_length(), 11);
        assert_eq!(envelope.content_nonce().unwrap().len(), NONCE_LENGTH);
        assert_eq!(envelope.content_hash().unwrap().len(), 32);
        assert_eq!(envelope.content_hash_algorithm(), Some("SHA-256"));
        assert_eq!(envelope.envelope_type(), Some(EnvelopeType::Document));
        assert_eq!(envelope.envelope_sub_type().unwrap().as_str(), "pdf");
        assert_eq!(envelope.time_stamp(), 1_000);
        assert!(envelope.validate_structure().is_ok());

        let mut expected = b"hello world".to_vec();
        expected.extend_from_slice(envelope.content_nonce().unwrap());
        assert_eq!(
            envelope.content_hash().unwrap(),
            notarius_crypto::sha256(&expected)
        );
    }

    #[test]
    fn test_digest_is_write_once() {
        let mut envelope = Envelope::new();
        envelope
            .compute_digest(b"content", EnvelopeType::Document, "txt")
            .unwrap();
        let hash = envelope.content_hash().unwrap().to_vec();

        let err = envelope
            .compute_digest(b"other", EnvelopeType::Document, "txt")
            .unwrap_err();
        assert!(matches!(err, CoreError::DigestAlreadySet));
        assert_eq!(envelope.content_hash().unwrap(), hash);
    }

    #[test]
    fn test_empty_content_rejected() {
        let mut envelope = Envelope::new();
        let err = envelope
            .compute_digest(b"", EnvelopeType::Document, "txt")
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyContent));
        assert!(envelope.content_hash().is_none());
        assert!(envelope.content_nonce().is_none());
    }

    #[test]
    fn test_same_content_different_nonce() {
        let a = Envelope::for_content(b"same", EnvelopeType::Document, "txt").unwrap();
        let b = Envelope::for_content(b"same", EnvelopeType::Document, "txt").unwrap();
        assert_ne!(a.content_nonce(), b.content_nonce());
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_reader_matches_slice() {
        let content = vec![7u8; 3 * READ_CHUNK + 5];
        let mut envelope = Envelope::new();
        envelope
            .compute_digest_from_reader(content.as_slice(), EnvelopeType::Contract, "bin", 5)
            .unwrap();

        assert_eq!(envelope.content_length(), content.len() as u64);
        assert!(envelope.matches_content(&content));
        assert!(!envelope.matches_content(&content[1..]));
    }

    #[test]
    fn test_matches_content() {
        let envelope = Envelope::for_content(b"the deed", EnvelopeType::Contract, "deed").unwrap();
        assert!(envelope.matches_content(b"the deed"));
        assert!(!envelope.matches_content(b"the deeD"));
        assert!(!Envelope::new().matches_content(b"the deed"));
    }

    #[test]
    fn test_claim_data_is_write_once() {
        let mut envelope = Envelope::new();
        envelope
            .set_claim_data(claims(&[("a", 1.into())]))
            .unwrap();
        let err = envelope
            .set_claim_data(claims(&[("b", 2.into())]))
            .unwrap_err();
        assert!(matches!(err, CoreError::ClaimDataAlreadySet));
    }

    #[test]
    fn test_claim_data_validation() {
        let mut envelope = Envelope::new();
        assert!(matches!(
            envelope.set_claim_data(ClaimMap::new()),
            Err(CoreError::EmptyClaimData)
        ));
        assert!(envelope
            .set_claim_data(claims(&[("bad", ClaimValue::Double(f64::NAN))]))
            .is_err());

        // Deep nesting of valid values is fine
        let mut deep = ClaimMap::new();
        for depth in 0..32 {
            let mut outer = ClaimMap::new();
            outer.insert(format!("level{depth}"), ClaimValue::Map(deep));
            deep = outer;
        }
        assert!(envelope.set_claim_data(deep).is_ok());
    }

    #[test]
    fn test_canonical_field_order() {
        let mut envelope = Envelope::new();
        envelope
            .compute_digest_at(b"abc", EnvelopeType::Request, "x", 42)
            .unwrap();
        envelope
            .set_claim_data(claims(&[("k", "v".into())]))
            .unwrap();

        let json = String::from_utf8(envelope.canonical_serialize().unwrap()).unwrap();
        let order = [
            "\"Version\"",
            "\"ContentHash\"",
            "\"ContentLength\"",
            "\"ContentNonce\"",
            "\"ContentHashAlgorithm\"",
            "\"EnvelopeType\"",
            "\"EnvelopeSubType\"",
            "\"TimeStamp\"",
            "\"AdditionalInfo\"",
        ];
        let positions: Vec<usize> = order.iter().map(|f| json.find(f).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert!(json.contains(r#""EnvelopeType":"request""#));
    }

    #[test]
    fn test_canonical_is_deterministic() {
        let mut a = Envelope::new();
        a.compute_digest_at(b"abc", EnvelopeType::Document, "x", 1)
            .unwrap();
        let mut b = a.clone();

        a.set_claim_data(claims(&[("zeta", 1.into()), ("alpha", "a".into())]))
            .unwrap();
        b.set_claim_data(claims(&[("alpha", "a".into()), ("zeta", 1.into())]))
            .unwrap();

        assert_eq!(a.canonical_serialize().unwrap(), b.canonical_serialize().unwrap());
    }

    #[test]
    fn test_canonical_requires_digest() {
        assert!(matches!(
            Envelope::new().canonical_serialize(),
            Err(CoreError::MissingDigest)
        ));
    }

    #[test]
    fn test_json_roundtrip_and_omission() {
        let envelope = Envelope::for_content(b"abc", EnvelopeType::Document, "x").unwrap();
        let json = String::from_utf8(envelope.canonical_serialize().unwrap()).unwrap();
        assert!(!json.contains("AdditionalInfo"));

        let parsed: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.canonical_serialize().unwrap(), json.as_bytes());
    }

    #[test]
    fn test_receipt_nonce_bounds() {
        let mut envelope = Envelope::for_content(b"abc", EnvelopeType::Document, "x").unwrap();

        envelope.content_nonce = Some(vec![1u8; MIN_NONCE_LENGTH]);
        assert!(envelope.validate_structure().is_ok());

        envelope.content_nonce = Some(vec![1u8; MIN_NONCE_LENGTH - 1]);
        assert!(envelope.validate_structure().is_err());

        envelope.content_nonce = Some(vec![1u8; MAX_NONCE_LENGTH + 1]);
        assert!(envelope.validate_structure().is_err());
    }

    #[test]
    fn test_structure_checks() {
        let good = Envelope::for_content(b"abc", EnvelopeType::Document, "x").unwrap();

        let mut bad = good.clone();
        bad.version = 2;
        assert!(bad.validate_structure().is_err());

        let mut bad = good.clone();
        bad.content_hash_algorithm = Some("MD5".to_string());
        assert!(bad.validate_structure().is_err());

        let mut bad = good.clone();
        bad.content_hash = Some(vec![0u8; 20]);
        assert!(bad.validate_structure().is_err());

        assert!(Envelope::new().validate_structure().is_err());
    }

    #[test]
    fn test_envelope_type_tags() {
        for (tag, ty) in [
            ("attestation", EnvelopeType::Attestation),
            ("request", EnvelopeType::Request),
            ("document", EnvelopeType::Document),
            ("contract", EnvelopeType::Contract),
            ("instruction", EnvelopeType::Instruction),
        ] {
            assert_eq!(ty.as_str(), tag);
            assert_eq!(tag.parse::<EnvelopeType>().unwrap(), ty);
            assert_eq!(serde_json::to_string(&ty).unwrap(), format!("\"{tag}\""));
        }
        assert!("memo".parse::<EnvelopeType>().is_err());
        assert_eq!(EnvelopeSubType::key_registration().as_str(), "key registration");
    }
}
