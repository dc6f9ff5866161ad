//! Trust policy configuration
//!
//! Every knob the attestation issuer, request protocol and notary apply is
//! kept here rather than compiled in. A policy is usually loaded from TOML:
//!
//! ```toml
//! authority = "heimdallr.odin.earth"
//! notary = "notarius.odin.earth"
//! attestation_validity_years = 5
//! request_validity_days = 14
//! freshness_tolerance_minutes = 20
//! ```
//!
//! Missing keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    identity::DomainIdentity,
};

pub const DEFAULT_AUTHORITY: &str = "heimdallr.odin.earth";
pub const DEFAULT_NOTARY: &str = "notarius.odin.earth";
pub const MAX_ATTESTATION_VALIDITY_YEARS: u32 = 100;

/// Policy applied on top of the signed envelope primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrustPolicy {
    /// Identity issuing attestations
    pub authority: DomainIdentity,
    /// Identity sealing envelopes as notary
    pub notary: DomainIdentity,
    pub attestation_validity_years: u32,
    pub request_validity_days: u32,
    /// Allowed skew, either direction, between a request's first signature
    /// and the verifier's clock
    pub freshness_tolerance_minutes: u32,
    /// Serialized envelopes shorter than this are rejected unparsed
    pub min_envelope_size: usize,
    /// `{identity}` is replaced with the subject
    pub attestation_usage_policy_url: String,
    /// `{identity}` is replaced with the requester
    pub request_usage_policy_url: String,
    /// `{authority}` is replaced with the issuing authority
    pub verification_url: String,
    pub attestation_format: String,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            authority: DomainIdentity(DEFAULT_AUTHORITY.to_string()),
            notary: DomainIdentity(DEFAULT_NOTARY.to_string()),
            attestation_validity_years: 5,
            request_validity_days: 14,
            freshness_tolerance_minutes: 20,
            min_envelope_size: 200,
            attestation_usage_policy_url:
                "https://{identity}/policies/attestation-usage-policy".to_string(),
            request_usage_policy_url: "https://{identity}/policies/request-usage-policy"
                .to_string(),
            verification_url: "https://{authority}/api/v1/attestation/verify".to_string(),
            attestation_format: "SortedJson".to_string(),
        }
    }
}

impl TrustPolicy {
    /// Load a policy from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a policy from TOML and validate it.
    pub fn from_toml(content: &str) -> Result<Self> {
        let policy: Self = toml::from_str(content)
            .map_err(|e| CoreError::Config(format!("invalid policy TOML: {e}")))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("failed to serialize policy: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.attestation_validity_years == 0 {
            return Err(CoreError::Config(
                "attestation_validity_years must be positive".to_string(),
            ));
        }
        if self.attestation_validity_years > MAX_ATTESTATION_VALIDITY_YEARS {
            return Err(CoreError::Config(format!(
                "attestation_validity_years must not exceed {MAX_ATTESTATION_VALIDITY_YEARS}"
            )));
        }
        if self.request_validity_days == 0 {
            return Err(CoreError::Config(
                "request_validity_days must be positive".to_string(),
            ));
        }
        if self.freshness_tolerance_minutes == 0 {
            return Err(CoreError::Config(
                "freshness_tolerance_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn freshness_tolerance_millis(&self) -> i64 {
        i64::from(self.freshness_tolerance_minutes) * 60 * 1000
    }

    pub fn attestation_usage_policy_for(&self, subject: &DomainIdentity) -> String {
        self.attestation_usage_policy_url
            .replace("{identity}", subject.as_str())
    }

    pub fn request_usage_policy_for(&self, requester: &DomainIdentity) -> String {
        self.request_usage_policy_url
            .replace("{identity}", requester.as_str())
    }

    pub fn verification_url_for_authority(&self) -> String {
        self.verification_url
            .replace("{authority}", self.authority.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = TrustPolicy::default();
        assert_eq!(policy.authority.as_str(), "heimdallr.odin.earth");
        assert_eq!(policy.notary.as_str(), "notarius.odin.earth");
        assert_eq!(policy.attestation_validity_years, 5);
        assert_eq!(policy.request_validity_days, 14);
        assert_eq!(policy.freshness_tolerance_millis(), 20 * 60 * 1000);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let policy = TrustPolicy::from_toml(
            r#"
            authority = "attest.example"
            freshness_tolerance_minutes = 5
            "#,
        )
        .unwrap();
        assert_eq!(policy.authority.as_str(), "attest.example");
        assert_eq!(policy.freshness_tolerance_minutes, 5);
        assert_eq!(policy.request_validity_days, 14);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(TrustPolicy::from_toml("authority = \"no spaces allowed\"").is_err());
        assert!(TrustPolicy::from_toml("request_validity_days = 0").is_err());
        assert!(TrustPolicy::from_toml("unknown_knob = 1").is_err());
    }

    #[test]
    fn test_validity_years_bounded() {
        let err = TrustPolicy::from_toml("attestation_validity_years = 4294967295").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));

        let policy = TrustPolicy::from_toml("attestation_validity_years = 100").unwrap();
        assert_eq!(policy.attestation_validity_years, MAX_ATTESTATION_VALIDITY_YEARS);
    }

    #[test]
    fn test_toml_roundtrip() {
        let policy = TrustPolicy::default();
        let toml = policy.to_toml().unwrap();
        assert_eq!(TrustPolicy::from_toml(&toml).unwrap(), policy);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("policy.toml");
        std::fs::write(&path, "notary = \"seal.example\"\n").unwrap();

        let policy = TrustPolicy::from_file(&path).unwrap();
        assert_eq!(policy.notary.as_str(), "seal.example");
        assert!(TrustPolicy::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_url_templates() {
        let policy = TrustPolicy::default();
        let subject = DomainIdentity::parse("alice.example").unwrap();
        assert_eq!(
            policy.attestation_usage_policy_for(&subject),
            "https://alice.example/policies/attestation-usage-policy"
        );
        assert_eq!(
            policy.verification_url_for_authority(),
            "https://heimdallr.odin.earth/api/v1/attestation/verify"
        );
    }
}
