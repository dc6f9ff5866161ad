//! Domain-style identities (`alice.example`, `heimdallr.odin.earth`)

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};

const MAX_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// A validated, lower-case ASCII domain name identifying a participant
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainIdentity(pub(crate) String);

impl DomainIdentity {
    /// Parse and normalize an identity.
    ///
    /// Surrounding whitespace is trimmed and the name lower-cased. It must
    /// then have at least two dot-separated labels of 1..=63 characters from
    /// `[a-z0-9-]`, no label may begin or end with `-`, and the whole name
    /// may not exceed 253 characters.
    pub fn parse(raw: &str) -> Result<Self> {
        let name = raw.trim().to_ascii_lowercase();
        let invalid = |reason: &str| CoreError::InvalidIdentity {
            identity: raw.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("empty"));
        }
        if name.len() > MAX_LENGTH {
            return Err(invalid("longer than 253 characters"));
        }

        let labels: Vec<&str> = name.split('.').collect();
        if labels.len() < 2 {
            return Err(invalid("needs at least two labels"));
        }

        for label in labels {
            if label.is_empty() {
                return Err(invalid("empty label"));
            }
            if label.len() > MAX_LABEL_LENGTH {
                return Err(invalid("label longer than 63 characters"));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(invalid("label starts or ends with '-'"));
            }
            if !label
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
            {
                return Err(invalid("label contains characters outside [a-z0-9-]"));
            }
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DomainIdentity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for DomainIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for DomainIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DomainIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
