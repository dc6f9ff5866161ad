//! Claim values carried in an envelope's `AdditionalInfo`
//!
//! Claim data is a sorted map whose values are restricted to a closed set of
//! atomic types or further maps of the same shape. Lists and any other JSON
//! shape are rejected when parsing, so whatever ends up inside an envelope
//! always has one canonical serialization.

use std::{collections::BTreeMap, fmt};

use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Claim map, keys in lexicographic order
pub type ClaimMap = BTreeMap<String, ClaimValue>;

/// A single claim value
#[derive(Debug, Clone)]
pub enum ClaimValue {
    Null,
    Str(String),
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Float(f32),
    Map(ClaimMap),
}

/// Integers compare by value whatever their width, as do floats. A parsed
/// envelope picks the narrowest integer width, which need not be the one its
/// issuer stored.
impl PartialEq for ClaimValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ClaimValue::Null, ClaimValue::Null) => true,
            (ClaimValue::Str(a), ClaimValue::Str(b)) => a == b,
            (ClaimValue::Bool(a), ClaimValue::Bool(b)) => a == b,
            (ClaimValue::Map(a), ClaimValue::Map(b)) => a == b,
            (
                ClaimValue::Int(_) | ClaimValue::Long(_),
                ClaimValue::Int(_) | ClaimValue::Long(_),
            ) => self.as_i64() == other.as_i64(),
            (
                ClaimValue::Double(_) | ClaimValue::Float(_),
                ClaimValue::Double(_) | ClaimValue::Float(_),
            ) => self.as_f64() == other.as_f64(),
            _ => false,
        }
    }
}

impl ClaimValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ClaimMap> {
        match self {
            ClaimValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Integral value, whichever width it was stored with
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ClaimValue::Int(i) => Some(i64::from(*i)),
            ClaimValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Floating point value, `f32` widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ClaimValue::Double(d) => Some(*d),
            ClaimValue::Float(f) => Some(f64::from(*f)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ClaimValue::Null)
    }

    /// Checks what the type system cannot: floats must be finite, since JSON
    /// has no representation for NaN or infinity.
    pub fn validate(&self) -> Result<()> {
        match self {
            ClaimValue::Double(d) if !d.is_finite() => Err(CoreError::InvalidClaimValue(
                format!("non-finite double {d}"),
            )),
            ClaimValue::Float(f) if !f.is_finite() => Err(CoreError::InvalidClaimValue(
                format!("non-finite float {f}"),
            )),
            ClaimValue::Map(map) => validate_claim_map(map),
            _ => Ok(()),
        }
    }
}

/// Validate every value of a claim map, recursively
pub fn validate_claim_map(map: &ClaimMap) -> Result<()> {
    map.values().try_for_each(ClaimValue::validate)
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::Str(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::Str(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        ClaimValue::Bool(value)
    }
}

impl From<i32> for ClaimValue {
    fn from(value: i32) -> Self {
        ClaimValue::Int(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        ClaimValue::Long(value)
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        ClaimValue::Double(value)
    }
}

impl From<f32> for ClaimValue {
    fn from(value: f32) -> Self {
        ClaimValue::Float(value)
    }
}

impl From<ClaimMap> for ClaimValue {
    fn from(value: ClaimMap) -> Self {
        ClaimValue::Map(value)
    }
}

impl TryFrom<Value> for ClaimValue {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(ClaimValue::Null),
            Value::Bool(b) => Ok(ClaimValue::Bool(b)),
            Value::String(s) => Ok(ClaimValue::Str(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(integral(i))
                } else if let Some(f) = n.as_f64().filter(|_| n.is_f64()) {
                    let value = ClaimValue::Double(f);
                    value.validate()?;
                    Ok(value)
                } else {
                    Err(CoreError::InvalidClaimValue(format!(
                        "number {n} does not fit a signed 64-bit integer"
                    )))
                }
            }
            Value::Array(_) => Err(CoreError::InvalidClaimValue(
                "arrays are not allowed in claim data".to_string(),
            )),
            Value::Object(object) => {
                let mut map = ClaimMap::new();
                for (key, value) in object {
                    map.insert(key, ClaimValue::try_from(value)?);
                }
                Ok(ClaimValue::Map(map))
            }
        }
    }
}

/// Convert a JSON object into a claim map
pub fn claim_map_from_json(value: Value) -> Result<ClaimMap> {
    match ClaimValue::try_from(value)? {
        ClaimValue::Map(map) => Ok(map),
        other => Err(CoreError::InvalidClaimValue(format!(
            "expected an object, got {other:?}"
        ))),
    }
}

fn integral(i: i64) -> ClaimValue {
    match i32::try_from(i) {
        Ok(small) => ClaimValue::Int(small),
        Err(_) => ClaimValue::Long(i),
    }
}

// ============================================================================
// Serde
// ============================================================================

impl Serialize for ClaimValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ClaimValue::Null => serializer.serialize_unit(),
            ClaimValue::Str(s) => serializer.serialize_str(s),
            ClaimValue::Bool(b) => serializer.serialize_bool(*b),
            ClaimValue::Int(i) => serializer.serialize_i32(*i),
            ClaimValue::Long(l) => serializer.serialize_i64(*l),
            ClaimValue::Double(d) => serializer.serialize_f64(*d),
            // Widened so the text survives a parse, which always yields a double
            ClaimValue::Float(f) => serializer.serialize_f64(f64::from(*f)),
            ClaimValue::Map(map) => {
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    state.serialize_entry(key, value)?;
                }
                state.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ClaimValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ClaimValueVisitor)
    }
}

struct ClaimValueVisitor;

impl<'de> Visitor<'de> for ClaimValueVisitor {
    type Value = ClaimValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("null, a string, a boolean, a number or a map of claim values")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<ClaimValue, E> {
        Ok(ClaimValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<ClaimValue, E> {
        Ok(ClaimValue::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<ClaimValue, E> {
        Ok(ClaimValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<ClaimValue, E> {
        Ok(integral(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<ClaimValue, E> {
        i64::try_from(v)
            .map(integral)
            .map_err(|_| E::custom(format!("integer {v} does not fit a signed 64-bit integer")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<ClaimValue, E> {
        if v.is_finite() {
            Ok(ClaimValue::Double(v))
        } else {
            Err(E::custom("non-finite numbers are not allowed in claim data"))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ClaimValue, E> {
        Ok(ClaimValue::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<ClaimValue, E> {
        Ok(ClaimValue::Str(v))
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, _seq: A) -> std::result::Result<ClaimValue, A::Error> {
        Err(de::Error::custom("arrays are not allowed in claim data"))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<ClaimValue, A::Error> {
        let mut map = ClaimMap::new();
        while let Some((key, value)) = access.next_entry::<String, ClaimValue>()? {
            map.insert(key, value);
        }
        Ok(ClaimValue::Map(map))
    }
}

// ============================================================================
// Canonical stringify
// ============================================================================

/// Flatten a claim map into the textual preimage used by request and
/// instruction envelopes.
///
/// Keys are walked in sorted order and emitted as `key:value`, joined by `,`.
/// Nested maps become `key:{...}`. Strings are written verbatim, every other
/// scalar in its JSON form (`null`, `true`, `42`, `1.5`).
pub fn canonical_stringify(map: &ClaimMap) -> String {
    let mut out = String::new();
    write_map(&mut out, map);
    out
}

fn write_map(out: &mut String, map: &ClaimMap) {
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(key);
        out.push(':');
        match value {
            ClaimValue::Map(inner) => {
                out.push('{');
                write_map(out, inner);
                out.push('}');
            }
            ClaimValue::Str(s) => out.push_str(s),
            scalar => out.push_str(&scalar_text(scalar)),
        }
    }
}

fn scalar_text(value: &ClaimValue) -> String {
    match value {
        ClaimValue::Null => "null".to_string(),
        ClaimValue::Bool(b) => b.to_string(),
        ClaimValue::Int(i) => i.to_string(),
        ClaimValue::Long(l) => l.to_string(),
        ClaimValue::Double(d) => serde_json::to_string(d).unwrap_or_else(|_| "null".to_string()),
        ClaimValue::Float(f) => {
            serde_json::to_string(&f64::from(*f)).unwrap_or_else(|_| "null".to_string())
        }
        ClaimValue::Str(s) => s.clone(),
        ClaimValue::Map(_) => String::new(),
    }
}
