use std::path::Path;

use notarius_crypto::{public_key_to_jwk_base64url, P384};
use zeroize::Zeroizing;

use super::{Algorithm, KeySign};
use crate::error::{Error, Result};

// ============================================================================
// Core Key Structure
// ============================================================================

/// NIST P-384 signing key
///
/// # Examples
///
/// ```no_run
/// use notarius_key::{KeySign, P384Key};
///
/// let key = P384Key::generate().unwrap();
/// let signature = key.sign(b"Hello, World!").unwrap();
///
/// // Store it protected by a passphrase, load it back later
/// let pem = key.to_encrypted_pem(b"passphrase").unwrap();
/// let restored = P384Key::from_encrypted_pem(&pem, b"passphrase").unwrap();
/// assert_eq!(key.key_id_hex(), restored.key_id_hex());
/// ```
pub struct P384Key {
    inner: P384,
}

// ============================================================================
// Constructors
// ============================================================================

impl P384Key {
    /// Generate a new P-384 key pair
    pub fn generate() -> Result<Self> {
        let inner = P384::generate()
            .map_err(|e| Error::KeyError(format!("P-384 generation failed: {}", e)))?;
        Ok(Self { inner })
    }

    /// Import from PKCS8 PEM format
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let inner = P384::from_pkcs8_pem(pem)
            .map_err(|e| Error::ImportError(format!("P-384 PKCS8 PEM import failed: {}", e)))?;
        Ok(Self { inner })
    }

    /// Import from PKCS8 DER format
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let inner = P384::from_pkcs8_der(der)
            .map_err(|e| Error::ImportError(format!("P-384 PKCS8 DER import failed: {}", e)))?;
        Ok(Self { inner })
    }

    /// Import a PKCS8 PEM encrypted under a caller supplied secret
    pub fn from_encrypted_pem(pem: &str, secret: &[u8]) -> Result<Self> {
        let inner = P384::from_pkcs8_encrypted_pem(pem, secret).map_err(|e| {
            Error::ImportError(format!("P-384 encrypted PEM import failed: {}", e))
        })?;
        Ok(Self { inner })
    }

    /// Load a key file, decrypting it when a secret is given
    pub fn load_from_file<P: AsRef<Path>>(path: P, secret: Option<&[u8]>) -> Result<Self> {
        let pem = Zeroizing::new(std::fs::read_to_string(path)?);
        match secret {
            Some(secret) => Self::from_encrypted_pem(&pem, secret),
            None => Self::from_pkcs8_pem(&pem),
        }
    }
}

// ============================================================================
// Export
// ============================================================================

impl P384Key {
    pub fn to_pkcs8_pem(&self) -> Result<Zeroizing<String>> {
        self.inner
            .to_pkcs8_pem()
            .map_err(|e| Error::ExportError(format!("P-384 PKCS8 PEM export failed: {}", e)))
    }

    pub fn to_encrypted_pem(&self, secret: &[u8]) -> Result<Zeroizing<String>> {
        self.inner
            .to_pkcs8_encrypted_pem(secret)
            .map_err(|e| Error::ExportError(format!("P-384 encrypted PEM export failed: {}", e)))
    }

    pub fn to_spki_pem(&self) -> Result<String> {
        let pem = self.inner.to_spki_pem()?;
        Ok(pem)
    }

    /// Write the private key (encrypted when a secret is given)
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, secret: Option<&[u8]>) -> Result<()> {
        let pem = match secret {
            Some(secret) => self.to_encrypted_pem(secret)?,
            None => self.to_pkcs8_pem()?,
        };
        std::fs::write(path, pem.as_bytes())?;
        Ok(())
    }

    /// SHA-256 of the SPKI DER
    pub fn fingerprint_sha256_spki(&self) -> Result<[u8; 32]> {
        let fingerprint = self.inner.spki_sha256_fingerprint()?;
        Ok(fingerprint)
    }
}

// ============================================================================
// KeySign Trait Implementation
// ============================================================================

impl KeySign for P384Key {
    fn algorithm(&self) -> Algorithm {
        Algorithm::EcdsaP384Sha384
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.inner
            .sign(message)
            .map_err(|e| Error::SignatureError(format!("P-384 signing failed: {}", e)))
    }

    fn public_key_portable(&self) -> Result<String> {
        let portable = public_key_to_jwk_base64url(&self.inner.public_key())?;
        Ok(portable)
    }

    fn key_id_hex(&self) -> String {
        // First 8 bytes of the SPKI fingerprint
        match self.inner.spki_sha256_fingerprint() {
            Ok(fingerprint) => hex::encode(&fingerprint[..8]),
            Err(_) => String::from("unknown"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use notarius_crypto::verify_portable;

    use super::*;

    #[test]
    fn test_p384_key_generation() {
        let key = P384Key::generate().unwrap();
        assert_eq!(key.algorithm(), Algorithm::EcdsaP384Sha384);
        assert_eq!(key.algorithm().name(), "SHA384withECDSA");
    }

    #[test]
    fn test_p384_signing() {
        let key = P384Key::generate().unwrap();
        let message = b"Hello, P-384 World!";

        let signature = key.sign(message).unwrap();
        assert!(!signature.is_empty());

        let portable = key.public_key_portable().unwrap();
        assert!(verify_portable(&portable, message, &signature).unwrap());
    }

    #[test]
    fn test_p384_pem_roundtrip() {
        let key = P384Key::generate().unwrap();

        let pem = key.to_pkcs8_pem().unwrap();
        let imported = P384Key::from_pkcs8_pem(&pem).unwrap();
        assert_eq!(key.key_id_hex(), imported.key_id_hex());
        assert_eq!(
            key.public_key_portable().unwrap(),
            imported.public_key_portable().unwrap()
        );
    }

    #[test]
    fn test_p384_encrypted_pem_requires_secret() {
        let key = P384Key::generate().unwrap();
        let pem = key.to_encrypted_pem(b"hunter2").unwrap();

        assert!(P384Key::from_encrypted_pem(&pem, b"hunter3").is_err());
        assert!(P384Key::from_pkcs8_pem(&pem).is_err());

        let imported = P384Key::from_encrypted_pem(&pem, b"hunter2").unwrap();
        assert_eq!(key.key_id_hex(), imported.key_id_hex());
    }

    #[test]
    fn test_p384_file_roundtrip() {
        use tempfile::TempDir;

        let key = P384Key::generate().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("authority.key");

        key.save_to_file(&path, Some(b"s3cret")).unwrap();
        let loaded = P384Key::load_from_file(&path, Some(b"s3cret")).unwrap();
        assert_eq!(key.key_id_hex(), loaded.key_id_hex());
        assert!(P384Key::load_from_file(&path, None).is_err());
    }

    #[test]
    fn test_key_id_is_stable() {
        let key = P384Key::generate().unwrap();
        assert_eq!(key.key_id_hex().len(), 16);
        assert_eq!(key.key_id_hex(), key.key_id_hex());
        assert_eq!(
            &hex::encode(key.fingerprint_sha256_spki().unwrap())[..16],
            key.key_id_hex()
        );
    }
}
