//! Short-lived request and instruction envelopes
//!
//! A requester signs an envelope of type `request` or `instruction` whose
//! `AdditionalInfo` holds:
//!
//! | key                          | value                                  |
//! |------------------------------|----------------------------------------|
//! | `requestTimestampSeconds`    | issuance, Unix seconds                 |
//! | `expirationTimestampSeconds` | issuance + request validity            |
//! | `usagePolicyUrl`             | from the requester's own domain        |
//! | `data`                       | caller supplied claim map              |
//!
//! The envelope's content is [`canonical_stringify`] of that map, so the
//! receiver can recompute the digest from the metadata alone.
//!
//! Verification is strict and ordered: size, structure, signatures, content
//! digest, type, freshness of the first signature, then the first signer's
//! identity.

use notarius_key::KeySign;
use tracing::{debug, warn};

use crate::{
    clock::{Clock, SystemClock},
    config::TrustPolicy,
    envelope::{Envelope, EnvelopeSubType, EnvelopeType},
    error::{CoreError, Result},
    identity::DomainIdentity,
    signed::SignedEnvelope,
    value::{canonical_stringify, ClaimMap, ClaimValue},
};

pub const KEY_REQUEST_TIMESTAMP: &str = "requestTimestampSeconds";
pub const KEY_EXPIRATION_TIMESTAMP: &str = "expirationTimestampSeconds";
pub const KEY_USAGE_POLICY_URL: &str = "usagePolicyUrl";
pub const KEY_DATA: &str = "data";

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Builds and verifies request / instruction envelopes under a policy
pub struct RequestProtocol {
    policy: TrustPolicy,
    clock: Box<dyn Clock>,
}

impl RequestProtocol {
    pub fn new(policy: TrustPolicy) -> Self {
        Self {
            policy,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }
}

// ============================================================================
// Creation
// ============================================================================

impl RequestProtocol {
    /// A signed `request` envelope
    pub fn create_request(
        &self,
        requester: &DomainIdentity,
        key: &dyn KeySign,
        sub_type: &str,
        data: ClaimMap,
    ) -> Result<SignedEnvelope> {
        self.create(EnvelopeType::Request, sub_type, requester, key, data)
    }

    /// A signed `instruction` envelope
    pub fn create_instruction(
        &self,
        requester: &DomainIdentity,
        key: &dyn KeySign,
        sub_type: &str,
        data: ClaimMap,
    ) -> Result<SignedEnvelope> {
        self.create(EnvelopeType::Instruction, sub_type, requester, key, data)
    }

    /// Ask an authority to attest the claims in `data`
    pub fn create_attestation_request(
        &self,
        requester: &DomainIdentity,
        key: &dyn KeySign,
        data: ClaimMap,
    ) -> Result<SignedEnvelope> {
        self.create_instruction(requester, key, EnvelopeSubType::ATTESTATION, data)
    }

    /// Register the signing key with a key registry
    pub fn create_key_registration(
        &self,
        requester: &DomainIdentity,
        key: &dyn KeySign,
        data: ClaimMap,
    ) -> Result<SignedEnvelope> {
        self.create_instruction(requester, key, EnvelopeSubType::KEY_REGISTRATION, data)
    }

    fn create(
        &self,
        envelope_type: EnvelopeType,
        sub_type: &str,
        requester: &DomainIdentity,
        key: &dyn KeySign,
        data: ClaimMap,
    ) -> Result<SignedEnvelope> {
        let now = self.clock.now();
        let seconds = now.timestamp();
        let expires = seconds + i64::from(self.policy.request_validity_days) * SECONDS_PER_DAY;

        let mut info = ClaimMap::new();
        info.insert(KEY_REQUEST_TIMESTAMP.into(), ClaimValue::Long(seconds));
        info.insert(KEY_EXPIRATION_TIMESTAMP.into(), ClaimValue::Long(expires));
        info.insert(
            KEY_USAGE_POLICY_URL.into(),
            self.policy.request_usage_policy_for(requester).into(),
        );
        info.insert(KEY_DATA.into(), ClaimValue::Map(data));

        let timestamp = now.timestamp_millis();
        let content = canonical_stringify(&info);
        let mut envelope = Envelope::new();
        envelope.compute_digest_at(content.as_bytes(), envelope_type, sub_type, timestamp)?;
        envelope.set_claim_data(info)?;

        let mut signed = SignedEnvelope::new(envelope)?;
        signed.add_signature_at(requester, key, timestamp)?;
        debug!(
            requester = %requester,
            envelope_type = %envelope_type,
            sub_type,
            "request envelope created"
        );
        Ok(signed)
    }
}

// ============================================================================
// Verification
// ============================================================================

impl RequestProtocol {
    /// Parse and verify a serialized request envelope.
    ///
    /// Returns the envelope when every check passes. Freshness failures are
    /// [`CoreError::NotFresh`], distinct from cryptographic rejection.
    pub fn verify(
        &self,
        json: &str,
        expected_type: EnvelopeType,
        expected_sub_type: &str,
    ) -> Result<SignedEnvelope> {
        if json.len() < self.policy.min_envelope_size {
            return Err(CoreError::EnvelopeTooSmall {
                actual: json.len(),
                minimum: self.policy.min_envelope_size,
            });
        }

        let signed = SignedEnvelope::from_json(json)?;

        if !signed.verify_all()? {
            debug!("request envelope failed signature verification");
            return Err(CoreError::VerificationFailed);
        }

        let envelope = signed.envelope();
        let info = envelope
            .additional_info()
            .ok_or_else(|| CoreError::InvalidEnvelope("request has no additional info".into()))?;
        if !envelope.matches_content(canonical_stringify(info).as_bytes()) {
            return Err(CoreError::ContentMismatch);
        }

        envelope.expect_type(expected_type, expected_sub_type)?;

        let first = signed.signatures().first().ok_or(CoreError::NoSignatures)?;
        let now = self.clock.now_millis();
        // The timestamp is signer-chosen; keep the arithmetic total
        let skew = now.saturating_sub(first.time_stamp);
        let tolerance = self.policy.freshness_tolerance_millis();
        if now.abs_diff(first.time_stamp) > tolerance.unsigned_abs() {
            warn!(
                identity = %first.identity,
                skew_ms = skew,
                "request envelope outside freshness window"
            );
            return Err(CoreError::NotFresh {
                timestamp_ms: first.time_stamp,
                skew_ms: skew,
                tolerance_ms: tolerance,
            });
        }

        DomainIdentity::parse(&first.identity)?;
        Ok(signed)
    }

    /// An `instruction` / `attestation` request
    pub fn verify_attestation_request(&self, json: &str) -> Result<SignedEnvelope> {
        self.verify(json, EnvelopeType::Instruction, EnvelopeSubType::ATTESTATION)
    }

    /// An `instruction` / `key registration` request, signed by exactly one
    /// identity
    pub fn verify_key_registration(&self, json: &str) -> Result<SignedEnvelope> {
        let signed = self.verify(
            json,
            EnvelopeType::Instruction,
            EnvelopeSubType::KEY_REGISTRATION,
        )?;
        if signed.signatures().len() != 1 {
            return Err(CoreError::SignatureCount {
                expected: "exactly 1".to_string(),
                actual: signed.signatures().len(),
            });
        }
        Ok(signed)
    }
}

/// The first signer of a verified request
pub fn requester_of(request: &SignedEnvelope) -> Result<DomainIdentity> {
    let first = request.signatures().first().ok_or(CoreError::NoSignatures)?;
    DomainIdentity::parse(&first.identity)
}
