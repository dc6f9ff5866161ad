//! Per-signer signature records
//!
//! The bytes handed to ECDSA are not the payload digest alone but an
//! identity-bound preimage:
//!
//! ```text
//! dataHash ‖ lp(dataHashAlgorithm) ‖ lp(identity) ‖ lp(publicKey)
//!          ‖ i64_be(timestamp) ‖ lp(signatureAlgorithm)
//! ```
//!
//! where `lp(s)` is the 4-byte big-endian length of `s` followed by its UTF-8
//! bytes. A signature therefore cannot be re-attributed to another signer,
//! key or instant over the same digest.

use notarius_crypto::{sha256, verify_portable, HASH_ALGORITHM_SHA256, SIGNATURE_ALGORITHM};
use notarius_key::KeySign;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::{
    clock::{Clock, SystemClock},
    error::{CoreError, Result},
    identity::DomainIdentity,
    wire,
};

pub const SIGNATURE_VERSION: u32 = 1;

/// One signer's signature over a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignatureRecord {
    #[serde(default)]
    pub version: u32,
    #[serde(default, with = "wire::b64")]
    pub data_hash: Vec<u8>,
    #[serde(default)]
    pub data_hash_algorithm: String,
    /// Signer identity as transmitted; policy layers parse it themselves
    #[serde(default)]
    pub identity: String,
    #[serde(default, rename = "PublicKeyJwkBase64Url")]
    pub public_key: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub time_stamp: i64,
    #[serde(default)]
    pub signature_algorithm: String,
    #[serde(default, with = "wire::b64")]
    pub signature: Vec<u8>,
}

impl SignatureRecord {
    /// Sign `payload` as `identity`, stamped with the current time
    pub fn sign(payload: &[u8], identity: &DomainIdentity, key: &dyn KeySign) -> Result<Self> {
        Self::sign_at(payload, identity, key, SystemClock.now_millis())
    }

    /// Sign `payload` as `identity` at `timestamp_ms`
    pub fn sign_at(
        payload: &[u8],
        identity: &DomainIdentity,
        key: &dyn KeySign,
        timestamp_ms: i64,
    ) -> Result<Self> {
        if payload.is_empty() {
            return Err(CoreError::EmptyContent);
        }

        let mut record = Self {
            version: SIGNATURE_VERSION,
            data_hash: sha256(payload).to_vec(),
            data_hash_algorithm: HASH_ALGORITHM_SHA256.to_string(),
            identity: identity.to_string(),
            public_key: key.public_key_portable()?,
            time_stamp: timestamp_ms,
            signature_algorithm: key.algorithm().name().to_string(),
            signature: Vec::new(),
        };
        record.signature = key.sign(&record.preimage())?;

        debug!(
            identity = %record.identity,
            key_id = %key.key_id_hex(),
            timestamp = record.time_stamp,
            "signature created"
        );
        Ok(record)
    }

    /// Check this record against the payload it claims to cover.
    ///
    /// The digest is compared first, in constant time; a mismatch returns
    /// `false` without touching ECDSA. Bad signatures and undecodable public
    /// keys are also `false`. Only a structurally incomplete record is an
    /// error.
    pub fn verify(&self, payload: &[u8]) -> Result<bool> {
        self.check_structure()?;

        let digest = sha256(payload);
        if !bool::from(digest[..].ct_eq(&self.data_hash)) {
            debug!(identity = %self.identity, "data hash mismatch");
            return Ok(false);
        }

        match verify_portable(&self.public_key, &self.preimage(), &self.signature) {
            Ok(true) => Ok(true),
            Ok(false) => {
                debug!(identity = %self.identity, "signature mismatch");
                Ok(false)
            }
            Err(e) => {
                debug!(identity = %self.identity, error = %e, "unusable public key");
                Ok(false)
            }
        }
    }

    /// Rejects records with missing or unsupported fields
    pub fn check_structure(&self) -> Result<()> {
        let malformed = |reason: &str| Err(CoreError::MalformedRecord(reason.to_string()));

        if self.version != SIGNATURE_VERSION {
            return malformed("unsupported version");
        }
        if self.data_hash.len() != 32 {
            return malformed("data hash is not 32 bytes");
        }
        if self.data_hash_algorithm != HASH_ALGORITHM_SHA256 {
            return malformed("unsupported data hash algorithm");
        }
        if self.identity.is_empty() {
            return malformed("missing identity");
        }
        if self.public_key.is_empty() {
            return malformed("missing public key");
        }
        if self.signature_algorithm != SIGNATURE_ALGORITHM {
            return malformed("unsupported signature algorithm");
        }
        if self.signature.is_empty() {
            return malformed("missing signature");
        }
        Ok(())
    }

    fn preimage(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.data_hash.len()
                + self.data_hash_algorithm.len()
                + self.identity.len()
                + self.public_key.len()
                + self.signature_algorithm.len()
                + 4 * 4
                + 8,
        );
        out.extend_from_slice(&self.data_hash);
        push_lp(&mut out, &self.data_hash_algorithm);
        push_lp(&mut out, &self.identity);
        push_lp(&mut out, &self.public_key);
        out.extend_from_slice(&self.time_stamp.to_be_bytes());
        push_lp(&mut out, &self.signature_algorithm);
        out
    }
}

fn push_lp(out: &mut Vec<u8>, s: &str) {
    // Field lengths are bounded far below 4 GiB by the wire format
    out.extend_from_slice(&(s.len() as u32).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use notarius_key::P384Key;

    use super::*;

    fn identity(name: &str) -> DomainIdentity {
        DomainIdentity::parse(name).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let key = P384Key::generate().unwrap();
        let record = SignatureRecord::sign(b"payload", &identity("alice.example"), &key).unwrap();

        assert_eq!(record.version, SIGNATURE_VERSION);
        assert_eq!(record.identity, "alice.example");
        assert_eq!(record.signature_algorithm, "SHA384withECDSA");
        assert_eq!(record.data_hash_algorithm, "SHA-256");
        assert_eq!(record.data_hash, sha256(b"payload").to_vec());
        assert!(record.verify(b"payload").unwrap());
    }

    #[test]
    fn test_empty_payload_rejected() {
        let key = P384Key::generate().unwrap();
        assert!(matches!(
            SignatureRecord::sign(b"", &identity("alice.example"), &key),
            Err(CoreError::EmptyContent)
        ));
    }

    #[test]
    fn test_altered_payload_fails() {
        let key = P384Key::generate().unwrap();
        let record = SignatureRecord::sign(b"payload", &identity("alice.example"), &key).unwrap();
        assert!(!record.verify(b"pAyload").unwrap());
        assert!(!record.verify(b"payload ").unwrap());
    }

    #[test]
    fn test_altered_fields_fail() {
        let key = P384Key::generate().unwrap();
        let record = SignatureRecord::sign_at(b"payload", &identity("alice.example"), &key, 10)
            .unwrap();

        let mut tampered = record.clone();
        tampered.identity = "mallory.example".to_string();
        assert!(!tampered.verify(b"payload").unwrap());

        let mut tampered = record.clone();
        tampered.time_stamp += 1;
        assert!(!tampered.verify(b"payload").unwrap());

        let mut tampered = record.clone();
        let last = tampered.signature.len() - 1;
        tampered.signature[last] ^= 0x01;
        assert!(!tampered.verify(b"payload").unwrap());

        let mut tampered = record.clone();
        tampered.signature[5] ^= 0x80;
        assert!(!tampered.verify(b"payload").unwrap());
    }

    #[test]
    fn test_forged_data_hash_is_not_enough() {
        let key = P384Key::generate().unwrap();
        let record = SignatureRecord::sign(b"original", &identity("alice.example"), &key).unwrap();

        let mut forged = record.clone();
        forged.data_hash = sha256(b"forged").to_vec();
        assert!(!forged.verify(b"forged").unwrap());
    }

    #[test]
    fn test_someone_elses_key_fails() {
        let alice = P384Key::generate().unwrap();
        let mallory = P384Key::generate().unwrap();
        let mut record =
            SignatureRecord::sign(b"payload", &identity("alice.example"), &alice).unwrap();
        record.public_key = mallory.public_key_portable().unwrap();
        assert!(!record.verify(b"payload").unwrap());

        record.public_key = "bm90IGEga2V5".to_string();
        assert!(!record.verify(b"payload").unwrap());
    }

    #[test]
    fn test_malformed_record_is_error() {
        let key = P384Key::generate().unwrap();
        let record = SignatureRecord::sign(b"payload", &identity("alice.example"), &key).unwrap();

        let mut broken = record.clone();
        broken.identity.clear();
        assert!(matches!(
            broken.verify(b"payload"),
            Err(CoreError::MalformedRecord(_))
        ));

        let mut broken = record.clone();
        broken.signature_algorithm = "SHA256withRSA".to_string();
        assert!(broken.verify(b"payload").is_err());

        let parsed: SignatureRecord = serde_json::from_str(r#"{"Version":1}"#).unwrap();
        assert!(parsed.verify(b"payload").is_err());
    }

    #[test]
    fn test_json_field_names() {
        let key = P384Key::generate().unwrap();
        let record = SignatureRecord::sign(b"payload", &identity("alice.example"), &key).unwrap();
        let json = serde_json::to_string(&record).unwrap();

        for field in [
            "Version",
            "DataHash",
            "DataHashAlgorithm",
            "Identity",
            "PublicKeyJwkBase64Url",
            "TimeStamp",
            "SignatureAlgorithm",
            "Signature",
        ] {
            assert!(json.contains(&format!("\"{field}\"")), "{field}");
        }

        let parsed: SignatureRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
        assert!(parsed.verify(b"payload").unwrap());
    }
}
