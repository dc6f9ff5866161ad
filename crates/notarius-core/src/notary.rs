use notarius_key::KeySign;
use tracing::info;

use crate::{
    clock::{Clock, SystemClock},
    config::TrustPolicy,
    envelope::EnvelopeType,
    error::{CoreError, Result},
    signed::SignedEnvelope,
};

/// Seals signed documents and contracts as the policy's notary identity.
///
/// Eligibility: the envelope is a `document` or `contract`, carries at least
/// one peer signature, is not notarized yet, and every peer signature
/// verifies. The fresh seal is verified before the envelope is returned.
pub struct NotaryService {
    policy: TrustPolicy,
    key: Box<dyn KeySign>,
    clock: Box<dyn Clock>,
}

impl NotaryService {
    pub fn new(policy: TrustPolicy, key: Box<dyn KeySign>) -> Self {
        Self {
            policy,
            key,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn notarize(&self, mut signed: SignedEnvelope) -> Result<SignedEnvelope> {
        match signed.envelope().envelope_type() {
            Some(EnvelopeType::Document) | Some(EnvelopeType::Contract) => {}
            other => {
                return Err(CoreError::WrongEnvelopeType {
                    expected: "document or contract".to_string(),
                    actual: other.map(|t| t.to_string()).unwrap_or_default(),
                })
            }
        }
        if signed.signatures().is_empty() {
            return Err(CoreError::NoSignatures);
        }
        if signed.notary().is_some() {
            return Err(CoreError::AlreadyNotarized);
        }

        signed.notarize_at(&self.policy.notary, &*self.key, self.clock.now_millis())?;
        if !signed.verify_notary()? {
            return Err(CoreError::VerificationFailed);
        }

        info!(
            notary = %self.policy.notary,
            envelope_type = ?signed.envelope().envelope_type(),
            "document notarized"
        );
        Ok(signed)
    }

    /// Parse a received aggregate, then [`notarize`](Self::notarize) it
    pub fn notarize_json(&self, json: &str) -> Result<SignedEnvelope> {
        self.notarize(SignedEnvelope::from_json(json)?)
    }
}

#[cfg(test)]
mod tests {
    use notarius_key::P384Key;

    use super::*;
    use crate::{
        envelope::Envelope, error::ErrorKind, identity::DomainIdentity,
        signed::EnvelopeState,
    };

    fn service() -> NotaryService {
        NotaryService::new(
            TrustPolicy::default(),
            Box::new(P384Key::generate().unwrap()),
        )
    }

    fn signed(envelope_type: EnvelopeType) -> SignedEnvelope {
        let key = P384Key::generate().unwrap();
        let envelope = Envelope::for_content(b"Terms and conditions", envelope_type, "terms").unwrap();
        let mut signed = SignedEnvelope::new(envelope).unwrap();
        signed
            .add_signature(&DomainIdentity::parse("alice.example").unwrap(), &key)
            .unwrap();
        signed
    }

    #[test]
    fn test_notarize_document_and_contract() {
        let service = service();
        for ty in [EnvelopeType::Document, EnvelopeType::Contract] {
            let sealed = service.notarize(signed(ty)).unwrap();
            assert_eq!(sealed.state(), EnvelopeState::Notarized);
            assert_eq!(sealed.notary().unwrap().identity, "notarius.odin.earth");
            assert!(sealed.verify_all().unwrap());
        }
    }

    #[test]
    fn test_rejects_other_types() {
        let err = service().notarize(signed(EnvelopeType::Attestation)).unwrap_err();
        assert!(matches!(err, CoreError::WrongEnvelopeType { .. }));
    }

    #[test]
    fn test_rejects_unsigned_and_sealed() {
        let service = service();
        let envelope = Envelope::for_content(b"draft", EnvelopeType::Document, "txt").unwrap();
        assert!(matches!(
            service.notarize(SignedEnvelope::new(envelope).unwrap()),
            Err(CoreError::NoSignatures)
        ));

        let sealed = service.notarize(signed(EnvelopeType::Document)).unwrap();
        let err = service.notarize(sealed).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyNotarized));
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_rejects_invalid_signature() {
        let mut broken = signed(EnvelopeType::Contract);
        broken.signatures_mut()[0].time_stamp -= 1;
        match service().notarize(broken) {
            Err(CoreError::InvalidSignature { identity }) => assert_eq!(identity, "alice.example"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_notarize_json() {
        let json = signed(EnvelopeType::Document).to_json().unwrap();
        let sealed = service().notarize_json(&json).unwrap();
        let reparsed = SignedEnvelope::from_json(&sealed.to_json().unwrap()).unwrap();
        assert!(reparsed.verify_all().unwrap());
    }
}
