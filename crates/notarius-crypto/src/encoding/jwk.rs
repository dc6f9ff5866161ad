//! JWK (RFC 7517) encoding of P-384 public keys
//!
//! The portable form is the compact JSON of the JWK, members in lexicographic
//! order (`crv`, `kty`, `x`, `y`, as in an RFC 7638 thumbprint), encoded as
//! base64url without padding. Identical keys therefore always produce
//! identical strings, which matters because the string is part of every
//! signed preimage.

use p384::PublicKey;
use serde::{Deserialize, Serialize};

use crate::{
    asymmetric::p384::{
        public_key_from_coordinates, public_key_from_spki_der, public_key_to_coordinates, verify,
    },
    error::{Error, Result},
    hash::base64,
};

const KTY_EC: &str = "EC";
const CRV_P384: &str = "P-384";

/// An elliptic curve public JWK
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcJwk {
    pub crv: String,
    pub kty: String,
    pub x: String,
    pub y: String,
}

impl EcJwk {
    pub fn from_public_key(public_key: &PublicKey) -> Result<Self> {
        let (x, y) = public_key_to_coordinates(public_key)?;
        Ok(Self {
            crv: CRV_P384.to_string(),
            kty: KTY_EC.to_string(),
            x: base64::encode_url_safe_no_pad(x),
            y: base64::encode_url_safe_no_pad(y),
        })
    }

    pub fn to_public_key(&self) -> Result<PublicKey> {
        if self.kty != KTY_EC {
            return Err(Error::JwkError(format!("unsupported kty '{}'", self.kty)));
        }
        if self.crv != CRV_P384 {
            return Err(Error::JwkError(format!("unsupported crv '{}'", self.crv)));
        }
        let x = base64::decode_url_safe_no_pad(&self.x)?;
        let y = base64::decode_url_safe_no_pad(&self.y)?;
        public_key_from_coordinates(&x, &y)
    }

    /// Compact JSON, members in declaration order
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::JwkError(e.to_string()))
    }

    pub fn from_json(json: &[u8]) -> Result<Self> {
        serde_json::from_slice(json).map_err(|e| Error::JwkError(e.to_string()))
    }
}

/// Encode a public key in the protocol's portable form
pub fn public_key_to_jwk_base64url(public_key: &PublicKey) -> Result<String> {
    let json = EcJwk::from_public_key(public_key)?.to_json()?;
    Ok(base64::encode_url_safe_no_pad(json))
}

/// Decode a portable public key.
///
/// Accepts a base64url JWK, or base64 (either alphabet) of an SPKI DER
/// structure.
pub fn public_key_from_portable(portable: &str) -> Result<PublicKey> {
    let bytes = match base64::decode_url_safe_no_pad(portable) {
        Ok(bytes) => bytes,
        Err(_) => base64::decode(portable)?,
    };
    match bytes.first() {
        Some(b'{') => EcJwk::from_json(&bytes)?.to_public_key(),
        Some(_) => public_key_from_spki_der(&bytes),
        None => Err(Error::JwkError("empty public key".to_string())),
    }
}

/// Verify `signature` over `message` against a portable public key.
///
/// Fails only when the key itself cannot be decoded; a bad signature is
/// `Ok(false)`.
pub fn verify_portable(portable: &str, message: &[u8], signature: &[u8]) -> Result<bool> {
    let public_key = public_key_from_portable(portable)?;
    Ok(verify(&public_key, message, signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asymmetric::P384;

    #[test]
    fn test_jwk_structure() {
        let key = P384::generate().unwrap();
        let jwk = EcJwk::from_public_key(&key.public_key()).unwrap();
        let json = jwk.to_json().unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["kty"], "EC");
        assert_eq!(parsed["crv"], "P-384");
        assert!(json.starts_with(r#"{"crv":"P-384","kty":"EC","x":""#));
    }

    #[test]
    fn test_portable_is_deterministic() {
        let key = P384::generate().unwrap();
        let a = public_key_to_jwk_base64url(&key.public_key()).unwrap();
        let b = public_key_to_jwk_base64url(&key.public_key()).unwrap();
        assert_eq!(a, b);
        assert!(!a.contains('=') && !a.contains('+') && !a.contains('/'));
    }

    #[test]
    fn test_portable_roundtrip() {
        let key = P384::generate().unwrap();
        let portable = public_key_to_jwk_base64url(&key.public_key()).unwrap();
        assert_eq!(public_key_from_portable(&portable).unwrap(), key.public_key());
    }

    #[test]
    fn test_portable_accepts_spki_der() {
        let key = P384::generate().unwrap();
        let der = key.to_spki_der().unwrap();
        let portable = base64::encode(&der);
        assert_eq!(public_key_from_portable(&portable).unwrap(), key.public_key());
    }

    #[test]
    fn test_wrong_curve_rejected() {
        let key = P384::generate().unwrap();
        let mut jwk = EcJwk::from_public_key(&key.public_key()).unwrap();
        jwk.crv = "P-256".to_string();
        assert!(jwk.to_public_key().is_err());
    }

    #[test]
    fn test_verify_portable() {
        let key = P384::generate().unwrap();
        let portable = public_key_to_jwk_base64url(&key.public_key()).unwrap();
        let signature = key.sign(b"message").unwrap();

        assert!(verify_portable(&portable, b"message", &signature).unwrap());
        assert!(!verify_portable(&portable, b"massage", &signature).unwrap());
        assert!(verify_portable("", b"message", &signature).is_err());
    }
}
