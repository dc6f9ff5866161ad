//! Multi-signature aggregate with optional notary seal
//!
//! Peer signatures cover the envelope's canonical bytes. The notary
//! signature covers the canonical bytes of the whole aggregate with the
//! notary field removed, so it certifies both the content and who co-signed
//! it.

use notarius_key::KeySign;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    clock::{Clock, SystemClock},
    envelope::Envelope,
    error::{CoreError, Result},
    identity::DomainIdentity,
    signature::SignatureRecord,
};

pub const SIGNED_ENVELOPE_VERSION: u32 = 1;

/// Lifecycle of a [`SignedEnvelope`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    /// No signatures yet
    Unsigned,
    /// At least one peer signature, no notary
    PartiallySigned,
    /// Sealed by a notary; terminal
    Notarized,
}

/// An envelope with its peer signatures and optional notary seal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedEnvelope {
    version: u32,
    envelope: Envelope,
    #[serde(default)]
    signatures: Vec<SignatureRecord>,
    #[serde(
        default,
        rename = "NotariusPublicus",
        skip_serializing_if = "Option::is_none"
    )]
    notary: Option<SignatureRecord>,
}

impl SignedEnvelope {
    /// Wrap an envelope whose digest has been computed
    pub fn new(envelope: Envelope) -> Result<Self> {
        if envelope.content_hash().is_none() {
            return Err(CoreError::MissingDigest);
        }
        Ok(Self {
            version: SIGNED_ENVELOPE_VERSION,
            envelope,
            signatures: Vec::new(),
            notary: None,
        })
    }

    pub fn state(&self) -> EnvelopeState {
        match (&self.notary, self.signatures.is_empty()) {
            (Some(_), _) => EnvelopeState::Notarized,
            (None, true) => EnvelopeState::Unsigned,
            (None, false) => EnvelopeState::PartiallySigned,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Peer signatures, ascending by timestamp
    pub fn signatures(&self) -> &[SignatureRecord] {
        &self.signatures
    }

    pub fn notary(&self) -> Option<&SignatureRecord> {
        self.notary.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn signatures_mut(&mut self) -> &mut Vec<SignatureRecord> {
        &mut self.signatures
    }
}

// ============================================================================
// Signing
// ============================================================================

impl SignedEnvelope {
    /// Co-sign the envelope, stamped with the current time
    pub fn add_signature(&mut self, identity: &DomainIdentity, key: &dyn KeySign) -> Result<()> {
        self.add_signature_at(identity, key, SystemClock.now_millis())
    }

    /// Co-sign the envelope at `timestamp_ms`.
    ///
    /// On failure the signature list is left untouched.
    pub fn add_signature_at(
        &mut self,
        identity: &DomainIdentity,
        key: &dyn KeySign,
        timestamp_ms: i64,
    ) -> Result<()> {
        if self.notary.is_some() {
            return Err(CoreError::AlreadyNotarized);
        }
        let payload = self.envelope.canonical_serialize()?;
        let record = SignatureRecord::sign_at(&payload, identity, key, timestamp_ms)?;
        self.insert_signature(record)
    }

    /// Append a finished record and restore timestamp order. Ties keep
    /// insertion order.
    pub(crate) fn insert_signature(&mut self, record: SignatureRecord) -> Result<()> {
        if self.notary.is_some() {
            return Err(CoreError::AlreadyNotarized);
        }
        self.signatures.push(record);
        self.signatures.sort_by_key(|s| s.time_stamp);
        Ok(())
    }

    /// Seal the envelope as notary, stamped with the current time
    pub fn notarize(&mut self, identity: &DomainIdentity, key: &dyn KeySign) -> Result<()> {
        self.notarize_at(identity, key, SystemClock.now_millis())
    }

    /// Seal the envelope as notary at `timestamp_ms`.
    ///
    /// Only a signed envelope can be sealed. Every peer signature must verify
    /// first; the first one that does not is reported by identity.
    pub fn notarize_at(
        &mut self,
        identity: &DomainIdentity,
        key: &dyn KeySign,
        timestamp_ms: i64,
    ) -> Result<()> {
        if self.notary.is_some() {
            return Err(CoreError::AlreadyNotarized);
        }
        if self.signatures.is_empty() {
            return Err(CoreError::NoSignatures);
        }

        let payload = self.envelope.canonical_serialize()?;
        for record in &self.signatures {
            if !record.verify(&payload)? {
                return Err(CoreError::InvalidSignature {
                    identity: record.identity.clone(),
                });
            }
        }

        let document = self.notary_payload()?;
        let record = SignatureRecord::sign_at(&document, identity, key, timestamp_ms)?;
        info!(
            notary = %identity,
            signatures = self.signatures.len(),
            "envelope notarized"
        );
        self.notary = Some(record);
        Ok(())
    }
}

// ============================================================================
// Verification
// ============================================================================

impl SignedEnvelope {
    /// Verify every peer signature and, when present, the notary.
    ///
    /// An envelope without peer signatures does not verify. Whether the
    /// signers or the notary are trusted is left to the caller.
    pub fn verify_all(&self) -> Result<bool> {
        if self.signatures.is_empty() {
            debug!("envelope has no signatures");
            return Ok(false);
        }

        let payload = self.envelope.canonical_serialize()?;
        for record in &self.signatures {
            if !record.verify(&payload)? {
                debug!(identity = %record.identity, "peer signature failed");
                return Ok(false);
            }
        }

        if self.notary.is_some() {
            return self.verify_notary();
        }
        Ok(true)
    }

    /// Verify the notary seal. Calling this on an envelope that has no
    /// notary is an error, not `false`.
    pub fn verify_notary(&self) -> Result<bool> {
        let notary = self.notary.as_ref().ok_or(CoreError::NotNotarized)?;
        let document = self.notary_payload()?;
        let valid = notary.verify(&document)?;
        if !valid {
            debug!(identity = %notary.identity, "notary signature failed");
        }
        Ok(valid)
    }

    /// A copy of this aggregate with the notary removed
    pub fn without_notary(&self) -> SignedEnvelope {
        SignedEnvelope {
            version: self.version,
            envelope: self.envelope.clone(),
            signatures: self.signatures.clone(),
            notary: None,
        }
    }

    /// The document a notary signs: the canonical form of
    /// [`without_notary`](Self::without_notary)
    pub fn notary_payload(&self) -> Result<Vec<u8>> {
        self.without_notary().canonical_serialize()
    }
}

// ============================================================================
// Serialization
// ============================================================================

impl SignedEnvelope {
    pub fn canonical_serialize(&self) -> Result<Vec<u8>> {
        self.envelope.canonical_serialize()?;
        Ok(serde_json::to_vec(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a received aggregate and check its shape.
    ///
    /// This is structural only: signatures are not verified here.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json)?;
        parsed.validate_structure()?;
        Ok(parsed)
    }

    pub fn validate_structure(&self) -> Result<()> {
        if self.version != SIGNED_ENVELOPE_VERSION {
            return Err(CoreError::InvalidEnvelope(format!(
                "unsupported signed envelope version {}",
                self.version
            )));
        }
        self.envelope.validate_structure()?;
        for record in self.signatures.iter().chain(self.notary.iter()) {
            record.check_structure()?;
        }
        Ok(())
    }
}
