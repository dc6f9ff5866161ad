//! Notarius Cryptography Library
//!
//! The primitives the signed-envelope protocol treats as opaque: ECDSA over
//! P-384 with SHA-384, SHA-256 digests, OS randomness, and the portable
//! encodings public keys travel in.

pub mod error;

pub mod asymmetric;
pub mod encoding;
pub mod hash;
pub mod random;

// Re-export commonly used types for convenience
pub use asymmetric::{p384::FIELD_SIZE, verify, P384, SIGNATURE_ALGORITHM};
pub use encoding::{
    public_key_from_portable, public_key_to_jwk_base64url, verify_portable, EcJwk,
};
pub use error::{Error, Result};
pub use hash::{base64, sha256, sha256_verify, Sha256State, HASH_ALGORITHM_SHA256};
pub use random::random_bytes;

pub use p384::PublicKey;
