//! P-384 (NIST secp384r1) ECDSA with SHA-384
//!
//! The only signature scheme used by the envelope protocol. Signatures are
//! DER encoded; public keys travel as SPKI DER or as a base64url JWK
//! (see [`crate::encoding::jwk`]).

use p384::{
    ecdsa::{signature::Signer, signature::Verifier, Signature, SigningKey, VerifyingKey},
    elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint},
    EncodedPoint, PublicKey, SecretKey,
};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Protocol-wide tag for ECDSA over P-384 with SHA-384
pub const SIGNATURE_ALGORITHM: &str = "SHA384withECDSA";

/// Length of a P-384 field element / scalar in bytes
pub const FIELD_SIZE: usize = 48;

pub struct P384 {
    pub inner: SecretKey,
}

impl From<SecretKey> for P384 {
    fn from(value: SecretKey) -> Self {
        Self { inner: value }
    }
}

impl P384 {
    /// Generate a new P-384 key pair
    pub fn generate() -> Result<Self> {
        let secret_key = SecretKey::random(&mut OsRng);
        Ok(secret_key.into())
    }

    /// Import from PKCS8 DER format
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let secret_key = SecretKey::from_pkcs8_der(der)?;
        Ok(secret_key.into())
    }

    /// Import from PKCS8 PEM format
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let secret_key = SecretKey::from_pkcs8_pem(pem)?;
        Ok(secret_key.into())
    }

    /// Import from a passphrase protected PKCS8 PEM (`ENCRYPTED PRIVATE KEY`)
    pub fn from_pkcs8_encrypted_pem(pem: &str, secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret_key = SecretKey::from_pkcs8_encrypted_pem(pem, secret)?;
        Ok(secret_key.into())
    }
}

impl P384 {
    /// Export private key to PKCS8 DER format
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let der = self.inner.to_pkcs8_der()?;
        Ok(Zeroizing::new(der.as_bytes().to_vec()))
    }

    /// Export private key to PKCS8 PEM format
    pub fn to_pkcs8_pem(&self) -> Result<Zeroizing<String>> {
        let pem = self.inner.to_pkcs8_pem(LineEnding::LF)?;
        Ok(pem)
    }

    /// Export private key to PKCS8 PEM encrypted under `secret`
    pub fn to_pkcs8_encrypted_pem(&self, secret: impl AsRef<[u8]>) -> Result<Zeroizing<String>> {
        let pem = self
            .inner
            .to_pkcs8_encrypted_pem(&mut OsRng, secret, LineEnding::LF)?;
        Ok(pem)
    }

    /// Export public key to SPKI DER format
    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        let der = self.inner.public_key().to_public_key_der()?;
        Ok(der.as_bytes().to_vec())
    }

    /// Export public key to SPKI PEM format
    pub fn to_spki_pem(&self) -> Result<String> {
        let pem = self.inner.public_key().to_public_key_pem(LineEnding::LF)?;
        Ok(pem)
    }

    /// Get raw scalar bytes
    pub fn to_scalar_bytes(&self) -> Zeroizing<[u8; FIELD_SIZE]> {
        let mut bytes = Zeroizing::new([0u8; FIELD_SIZE]);
        bytes.copy_from_slice(&self.inner.to_bytes());
        bytes
    }
}

impl P384 {
    /// Get the public key for this keypair
    pub fn public_key(&self) -> PublicKey {
        self.inner.public_key()
    }

    /// Sign data using ECDSA with SHA-384, DER encoded
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signing_key = SigningKey::from(&self.inner);
        let signature: Signature = signing_key.sign(message);
        Ok(signature.to_der().as_bytes().to_vec())
    }

    /// Generate SPKI SHA-256 fingerprint
    pub fn spki_sha256_fingerprint(&self) -> Result<[u8; 32]> {
        let spki = self.to_spki_der()?;
        Ok(Sha256::digest(&spki).into())
    }
}

/// Verify a DER encoded P-384 ECDSA signature with SHA-384.
///
/// A signature that does not parse is simply invalid.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    let verifying_key = VerifyingKey::from(public_key);
    let signature = match Signature::from_der(signature) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    verifying_key.verify(message, &signature).is_ok()
}

/// Import public key from SPKI DER format
pub fn public_key_from_spki_der(der: &[u8]) -> Result<PublicKey> {
    PublicKey::from_public_key_der(der).map_err(Into::into)
}

/// Import public key from its affine coordinates
pub fn public_key_from_coordinates(x: &[u8], y: &[u8]) -> Result<PublicKey> {
    if x.len() != FIELD_SIZE || y.len() != FIELD_SIZE {
        return Err(Error::InvalidLength {
            expected: format!("{} byte coordinates", FIELD_SIZE),
            actual: x.len().max(y.len()),
        });
    }
    let encoded_point = EncodedPoint::from_affine_coordinates(
        p384::FieldBytes::from_slice(x),
        p384::FieldBytes::from_slice(y),
        false,
    );
    Option::from(PublicKey::from_encoded_point(&encoded_point))
        .ok_or_else(|| Error::Other("Invalid public key point".to_string()))
}

/// Split a public key into its affine coordinates
pub fn public_key_to_coordinates(public_key: &PublicKey) -> Result<(Vec<u8>, Vec<u8>)> {
    let encoded_point = public_key.to_encoded_point(false);
    match (encoded_point.x(), encoded_point.y()) {
        (Some(x), Some(y)) => Ok((x.to_vec(), y.to_vec())),
        _ => Err(Error::Other("Failed to extract coordinates".to_string())),
    }
}
