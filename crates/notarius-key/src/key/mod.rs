pub mod p384;
pub mod util;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use self::p384::P384Key;

/// Signature algorithms a key handle can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// ECDSA over NIST P-384 with SHA-384
    EcdsaP384Sha384,
}

impl Algorithm {
    /// Wire tag carried in signature records
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::EcdsaP384Sha384 => notarius_crypto::SIGNATURE_ALGORITHM,
        }
    }
}

// ============================================================================
// Signing seam
// ============================================================================

/// A handle to a private key able to sign for an identity.
///
/// The protocol never sees key material, only this trait. Implementations
/// may hold the key in memory, behind a passphrase, or in a remote signer.
pub trait KeySign: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    /// Sign `message`, returning the encoded signature
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;

    /// The public half in the protocol's portable encoding
    fn public_key_portable(&self) -> Result<String>;

    /// Short identifier derived from the public key, for logs
    fn key_id_hex(&self) -> String;
}

impl<T: KeySign + ?Sized> KeySign for &T {
    fn algorithm(&self) -> Algorithm {
        (**self).algorithm()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        (**self).sign(message)
    }

    fn public_key_portable(&self) -> Result<String> {
        (**self).public_key_portable()
    }

    fn key_id_hex(&self) -> String {
        (**self).key_id_hex()
    }
}

impl<T: KeySign + ?Sized> KeySign for Box<T> {
    fn algorithm(&self) -> Algorithm {
        (**self).algorithm()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        (**self).sign(message)
    }

    fn public_key_portable(&self) -> Result<String> {
        (**self).public_key_portable()
    }

    fn key_id_hex(&self) -> String {
        (**self).key_id_hex()
    }
}
