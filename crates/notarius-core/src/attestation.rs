//! Attestation issuance
//!
//! An attestation is a signed envelope of type `attestation` in which a
//! trusted authority states one fact about a subject identity. The fact sits
//! under `AdditionalInfo.data` as a single-key map next to the issuance
//! metadata:
//!
//! ```json
//! {
//!   "authority": "heimdallr.odin.earth",
//!   "data": { "LegalName": "Alice A. Example" },
//!   "expiration": "2031-10-16",
//!   "format": "SortedJson",
//!   "identity": "alice.example",
//!   "issued": "2026-10-16",
//!   "usagePolicyUrl": "https://alice.example/policies/attestation-usage-policy",
//!   "verificationUrl": "https://heimdallr.odin.earth/api/v1/attestation/verify"
//! }
//! ```
//!
//! Expiration is metadata only. [`SignedEnvelope::verify_all`] does not look
//! at it; consumers use [`expiration_of`] / [`is_expired_at`].

use chrono::{Months, NaiveDate};
use notarius_crypto::base64;
use notarius_key::KeySign;
use tracing::info;

use crate::{
    clock::{Clock, SystemClock},
    config::TrustPolicy,
    envelope::{Envelope, EnvelopeSubType, EnvelopeType},
    error::{CoreError, Result},
    identity::DomainIdentity,
    signed::SignedEnvelope,
    value::{canonical_stringify, ClaimMap, ClaimValue},
};

pub const CLAIM_IS_HUMAN: &str = "IsHuman";
pub const CLAIM_LEGAL_NAME: &str = "LegalName";
pub const CLAIM_SUBSET_LEGAL_NAME: &str = "SubsetLegalName";
pub const CLAIM_RESIDENTIAL_ADDRESS: &str = "ResidentialAddress";
pub const CLAIM_EMAIL_ADDRESS: &str = "EmailAddress";
pub const CLAIM_PHONE_NUMBER: &str = "PhoneNumber";
pub const CLAIM_BIRTHDATE: &str = "Birthdate";
pub const CLAIM_NATIONALITY: &str = "Nationality";

pub const KEY_IDENTITY: &str = "identity";
pub const KEY_ISSUED: &str = "issued";
pub const KEY_EXPIRATION: &str = "expiration";
pub const KEY_AUTHORITY: &str = "authority";
pub const KEY_VERIFICATION_URL: &str = "verificationUrl";
pub const KEY_FORMAT: &str = "format";
pub const KEY_USAGE_POLICY_URL: &str = "usagePolicyUrl";
pub const KEY_DATA: &str = "data";
pub const KEY_ATTESTATION_ID: &str = "attestationId";

const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Claims
// ============================================================================

/// The facts an authority can attest to
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    IsHuman,
    LegalName(String),
    /// A shortened legal name, see [`Claim::subset_legal_name_of`]
    SubsetLegalName(String),
    ResidentialAddress(ClaimMap),
    EmailAddress(String),
    PhoneNumber(String),
    Birthdate(NaiveDate),
    Nationality(String),
}

impl Claim {
    /// Wire key under `data`
    pub fn key(&self) -> &'static str {
        match self {
            Claim::IsHuman => CLAIM_IS_HUMAN,
            Claim::LegalName(_) => CLAIM_LEGAL_NAME,
            Claim::SubsetLegalName(_) => CLAIM_SUBSET_LEGAL_NAME,
            Claim::ResidentialAddress(_) => CLAIM_RESIDENTIAL_ADDRESS,
            Claim::EmailAddress(_) => CLAIM_EMAIL_ADDRESS,
            Claim::PhoneNumber(_) => CLAIM_PHONE_NUMBER,
            Claim::Birthdate(_) => CLAIM_BIRTHDATE,
            Claim::Nationality(_) => CLAIM_NATIONALITY,
        }
    }

    pub fn value(&self) -> ClaimValue {
        match self {
            Claim::IsHuman => ClaimValue::Bool(true),
            Claim::LegalName(s)
            | Claim::SubsetLegalName(s)
            | Claim::EmailAddress(s)
            | Claim::PhoneNumber(s)
            | Claim::Nationality(s) => ClaimValue::Str(s.trim().to_string()),
            Claim::ResidentialAddress(map) => ClaimValue::Map(map.clone()),
            Claim::Birthdate(date) => ClaimValue::Str(date.format(DATE_FORMAT).to_string()),
        }
    }

    /// Reject empty or obviously malformed payloads before anything is signed.
    ///
    /// A subset legal name on its own must still name at least two parts,
    /// typically a given name and the surname.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(CoreError::InvalidClaimValue(format!(
                "{}: {reason}",
                self.key()
            )))
        };

        match self {
            Claim::IsHuman | Claim::Birthdate(_) => Ok(()),
            Claim::LegalName(s) | Claim::Nationality(s) | Claim::PhoneNumber(s) => {
                if s.trim().is_empty() {
                    return invalid("empty");
                }
                Ok(())
            }
            Claim::SubsetLegalName(s) => {
                if s.split_whitespace().count() < 2 {
                    return invalid("needs at least two name parts");
                }
                Ok(())
            }
            Claim::EmailAddress(s) => match s.trim().split_once('@') {
                Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
                _ => invalid("not an email address"),
            },
            Claim::ResidentialAddress(map) => {
                if map.is_empty() {
                    return invalid("empty");
                }
                crate::value::validate_claim_map(map)
            }
        }
    }

    /// Build a subset legal name checked against the full legal name.
    ///
    /// Each part of `subset` must match a part of `legal_name` in order,
    /// either exactly or as an initial (`"J."` for `"John"`), and the last
    /// part of the legal name (the surname) must be kept.
    pub fn subset_legal_name_of(legal_name: &str, subset: &str) -> Result<Claim> {
        let legal: Vec<&str> = legal_name.split_whitespace().collect();
        let parts: Vec<&str> = subset.split_whitespace().collect();
        let reject = |reason: &str| {
            Err(CoreError::InvalidClaimValue(format!(
                "{CLAIM_SUBSET_LEGAL_NAME}: {reason}"
            )))
        };

        if parts.is_empty() || legal.is_empty() {
            return reject("empty");
        }
        if parts.last() != legal.last() {
            return reject("must keep the surname");
        }

        let mut remaining = legal.iter();
        for part in &parts {
            if !remaining.any(|word| name_part_matches(part, word)) {
                return reject("is not a subset of the legal name");
            }
        }

        let claim = Claim::SubsetLegalName(parts.join(" "));
        claim.validate()?;
        Ok(claim)
    }
}

fn name_part_matches(part: &str, word: &str) -> bool {
    if part == word {
        return true;
    }
    match part.strip_suffix('.') {
        Some(initial) if initial.chars().count() == 1 => word.starts_with(initial),
        _ => false,
    }
}

// ============================================================================
// Issuer
// ============================================================================

/// Issues attestations as the policy's authority identity
pub struct AttestationIssuer {
    policy: TrustPolicy,
    key: Box<dyn KeySign>,
    clock: Box<dyn Clock>,
}

impl AttestationIssuer {
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

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Issue one attestation
    pub fn issue(&self, subject: &DomainIdentity, claim: Claim) -> Result<SignedEnvelope> {
        self.issue_with_id(subject, claim, None)
    }

    pub fn attest_human(&self, subject: &DomainIdentity) -> Result<SignedEnvelope> {
        self.issue(subject, Claim::IsHuman)
    }

    pub fn attest_legal_name(&self, subject: &DomainIdentity, name: &str) -> Result<SignedEnvelope> {
        self.issue(subject, Claim::LegalName(name.to_string()))
    }

    pub fn attest_subset_legal_name(
        &self,
        subject: &DomainIdentity,
        subset: &str,
    ) -> Result<SignedEnvelope> {
        self.issue(subject, Claim::SubsetLegalName(subset.to_string()))
    }

    pub fn attest_residential_address(
        &self,
        subject: &DomainIdentity,
        address: ClaimMap,
    ) -> Result<SignedEnvelope> {
        self.issue(subject, Claim::ResidentialAddress(address))
    }

    pub fn attest_email_address(
        &self,
        subject: &DomainIdentity,
        email: &str,
    ) -> Result<SignedEnvelope> {
        self.issue(subject, Claim::EmailAddress(email.to_string()))
    }

    pub fn attest_phone_number(
        &self,
        subject: &DomainIdentity,
        phone: &str,
    ) -> Result<SignedEnvelope> {
        self.issue(subject, Claim::PhoneNumber(phone.to_string()))
    }

    pub fn attest_birthdate(
        &self,
        subject: &DomainIdentity,
        birthdate: NaiveDate,
    ) -> Result<SignedEnvelope> {
        self.issue(subject, Claim::Birthdate(birthdate))
    }

    pub fn attest_nationality(
        &self,
        subject: &DomainIdentity,
        nationality: &str,
    ) -> Result<SignedEnvelope> {
        self.issue(subject, Claim::Nationality(nationality.to_string()))
    }

    /// Turn an approved `instruction`/`attestation` request into attestations.
    ///
    /// `IsHuman` is always issued, followed by one attestation per recognised
    /// claim found in the request's `data`. Each carries the request's nonce
    /// as `attestationId`. The subject is the request's first signer.
    pub fn issue_from_request(&self, request: &SignedEnvelope) -> Result<Vec<SignedEnvelope>> {
        let envelope = request.envelope();
        envelope.expect_type(EnvelopeType::Instruction, EnvelopeSubType::ATTESTATION)?;

        if !request.verify_all()? {
            return Err(CoreError::VerificationFailed);
        }

        let first = request.signatures().first().ok_or(CoreError::NoSignatures)?;
        let subject = DomainIdentity::parse(&first.identity)?;

        let data = envelope
            .additional_info()
            .and_then(|info| info.get(KEY_DATA))
            .and_then(ClaimValue::as_map)
            .ok_or_else(|| {
                CoreError::InvalidEnvelope("request has no data section".to_string())
            })?;

        let attestation_id = envelope
            .content_nonce()
            .map(base64::encode)
            .ok_or_else(|| CoreError::InvalidEnvelope("request has no nonce".to_string()))?;

        let mut claims = vec![Claim::IsHuman];
        if let Some(value) = data.get(CLAIM_LEGAL_NAME) {
            claims.push(Claim::LegalName(string_claim(CLAIM_LEGAL_NAME, value)?));
        }
        if let Some(value) = data.get(CLAIM_SUBSET_LEGAL_NAME) {
            let subset = string_claim(CLAIM_SUBSET_LEGAL_NAME, value)?;
            let claim = match data.get(CLAIM_LEGAL_NAME).and_then(ClaimValue::as_str) {
                Some(legal_name) => Claim::subset_legal_name_of(legal_name, &subset)?,
                None => Claim::SubsetLegalName(subset),
            };
            claims.push(claim);
        }
        if let Some(value) = data.get(CLAIM_NATIONALITY) {
            claims.push(Claim::Nationality(string_claim(CLAIM_NATIONALITY, value)?));
        }
        if let Some(value) = data.get(CLAIM_PHONE_NUMBER) {
            claims.push(Claim::PhoneNumber(string_claim(CLAIM_PHONE_NUMBER, value)?));
        }
        if let Some(value) = data.get(CLAIM_EMAIL_ADDRESS) {
            claims.push(Claim::EmailAddress(string_claim(CLAIM_EMAIL_ADDRESS, value)?));
        }
        if let Some(value) = data.get(CLAIM_BIRTHDATE) {
            let text = string_claim(CLAIM_BIRTHDATE, value)?;
            let date = NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| {
                CoreError::InvalidClaimValue(format!("{CLAIM_BIRTHDATE}: {e}"))
            })?;
            claims.push(Claim::Birthdate(date));
        }
        if let Some(value) = data.get(CLAIM_RESIDENTIAL_ADDRESS) {
            let address = value.as_map().cloned().ok_or_else(|| {
                CoreError::InvalidClaimValue(format!("{CLAIM_RESIDENTIAL_ADDRESS}: expected a map"))
            })?;
            claims.push(Claim::ResidentialAddress(address));
        }

        // Validate everything before signing anything
        for claim in &claims {
            claim.validate()?;
        }

        claims
            .into_iter()
            .map(|claim| self.issue_with_id(&subject, claim, Some(&attestation_id)))
            .collect()
    }

    fn issue_with_id(
        &self,
        subject: &DomainIdentity,
        claim: Claim,
        attestation_id: Option<&str>,
    ) -> Result<SignedEnvelope> {
        claim.validate()?;

        let now = self.clock.now();
        let issued = now.date_naive();
        let expiration = self
            .policy
            .attestation_validity_years
            .checked_mul(12)
            .and_then(|months| issued.checked_add_months(Months::new(months)))
            .ok_or_else(|| CoreError::Config("attestation expiry out of range".to_string()))?;

        let mut data = ClaimMap::new();
        data.insert(claim.key().to_string(), claim.value());

        let mut info = ClaimMap::new();
        info.insert(KEY_IDENTITY.into(), subject.as_str().into());
        info.insert(KEY_ISSUED.into(), issued.format(DATE_FORMAT).to_string().into());
        info.insert(
            KEY_EXPIRATION.into(),
            expiration.format(DATE_FORMAT).to_string().into(),
        );
        info.insert(KEY_AUTHORITY.into(), self.policy.authority.as_str().into());
        info.insert(
            KEY_VERIFICATION_URL.into(),
            self.policy.verification_url_for_authority().into(),
        );
        info.insert(KEY_FORMAT.into(), self.policy.attestation_format.clone().into());
        info.insert(
            KEY_USAGE_POLICY_URL.into(),
            self.policy.attestation_usage_policy_for(subject).into(),
        );
        info.insert(KEY_DATA.into(), ClaimValue::Map(data));
        if let Some(id) = attestation_id {
            info.insert(KEY_ATTESTATION_ID.into(), id.into());
        }

        let timestamp = now.timestamp_millis();
        let content = canonical_stringify(&info);
        let mut envelope = Envelope::new();
        envelope.compute_digest_at(
            content.as_bytes(),
            EnvelopeType::Attestation,
            claim.key(),
            timestamp,
        )?;
        envelope.set_claim_data(info)?;

        let mut signed = SignedEnvelope::new(envelope)?;
        signed.add_signature_at(&self.policy.authority, &*self.key, timestamp)?;

        info!(
            subject = %subject,
            claim = claim.key(),
            authority = %self.policy.authority,
            "attestation issued"
        );
        Ok(signed)
    }
}

fn string_claim(key: &str, value: &ClaimValue) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CoreError::InvalidClaimValue(format!("{key}: expected a string")))
}

// ============================================================================
// Advisory expiry
// ============================================================================

/// The `expiration` date embedded in an attestation
pub fn expiration_of(attestation: &SignedEnvelope) -> Result<NaiveDate> {
    let text = attestation
        .envelope()
        .additional_info()
        .and_then(|info| info.get(KEY_EXPIRATION))
        .and_then(ClaimValue::as_str)
        .ok_or_else(|| CoreError::InvalidEnvelope("attestation has no expiration".to_string()))?;
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| CoreError::InvalidEnvelope(format!("invalid expiration '{text}': {e}")))
}

/// Whether the attestation has expired as of `date`. It is still valid on
/// its expiration date.
pub fn is_expired_at(attestation: &SignedEnvelope, date: NaiveDate) -> Result<bool> {
    Ok(date > expiration_of(attestation)?)
}

/// The single attested fact in an attestation's `data`
pub fn claim_of(attestation: &SignedEnvelope) -> Option<(&str, &ClaimValue)> {
    let data = attestation
        .envelope()
        .additional_info()?
        .get(KEY_DATA)?
        .as_map()?;
    data.iter().next().map(|(k, v)| (k.as_str(), v))
}
