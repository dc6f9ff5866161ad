//! Cryptographic hash functions and encoding utilities
//!
//! SHA-256 is the protocol's content and data digest; SHA-384 is only used
//! internally by ECDSA. Base64 helpers cover the envelope wire format.

pub mod base64;
pub mod sha;

pub use sha::{sha256, sha256_verify, Sha256State, HASH_ALGORITHM_SHA256};
