//! SHA-256 hash functions
//!
//! One-shot helpers plus an incremental state for hashing content streams.

use sha2::{Digest, Sha256 as Sha256Hasher};
use subtle::ConstantTimeEq;

/// Wire tag for SHA-256
pub const HASH_ALGORITHM_SHA256: &str = "SHA-256";

// ============================================================================
// SHA-256 Functions
// ============================================================================

/// Compute SHA-256 hash of data
///
/// # Arguments
/// * `data` - Data to hash
///
/// # Returns
/// 32-byte hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256Hasher::digest(data).into()
}

/// Verify that data matches a given SHA-256 hash.
///
/// The comparison runs in constant time; a length mismatch is a plain `false`.
pub fn sha256_verify(data: &[u8], expected_hash: &[u8]) -> bool {
    sha256(data)[..].ct_eq(expected_hash).into()
}

// ============================================================================
// Incremental hashing
// ============================================================================

/// Incremental SHA-256 over a byte stream, counting the bytes it has seen.
#[derive(Clone, Default)]
pub struct Sha256State {
    hasher: Sha256Hasher,
    length: u64,
}

impl Sha256State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.length += data.len() as u64;
    }

    /// Number of bytes fed so far
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn finalize(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }
}
