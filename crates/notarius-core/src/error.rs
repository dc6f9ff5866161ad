//! Core error types

use thiserror::Error;

/// Broad classes of failure, so callers can tell "forged" from "stale" from
/// "you called this wrong" without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Programmer error: a required field is missing or a write-once field was written twice
    Precondition,
    /// Client supplied data that is malformed or of the wrong shape
    InvalidInput,
    /// A signature or digest did not check out
    Verification,
    /// Outside the allowed time window
    Freshness,
    /// The crypto or key layer failed
    Crypto,
}

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    // ------------------------------------------------------------------
    // Structural / precondition
    // ------------------------------------------------------------------
    #[error("Content digest has already been computed")]
    DigestAlreadySet,

    #[error("Claim data has already been set")]
    ClaimDataAlreadySet,

    #[error("Envelope has no content digest")]
    MissingDigest,

    #[error("Envelope is already notarized")]
    AlreadyNotarized,

    #[error("Envelope is not notarized")]
    NotNotarized,

    #[error("Envelope has no signatures")]
    NoSignatures,

    #[error("Malformed signature record: {0}")]
    MalformedRecord(String),

    // ------------------------------------------------------------------
    // Input validation
    // ------------------------------------------------------------------
    #[error("Content is empty")]
    EmptyContent,

    #[error("Claim data is empty")]
    EmptyClaimData,

    #[error("Invalid claim value: {0}")]
    InvalidClaimValue(String),

    #[error("Invalid identity '{identity}': {reason}")]
    InvalidIdentity { identity: String, reason: String },

    #[error("Envelope too small: {actual} bytes, minimum is {minimum}")]
    EnvelopeTooSmall { actual: usize, minimum: usize },

    #[error("Expected envelope type '{expected}', got '{actual}'")]
    WrongEnvelopeType { expected: String, actual: String },

    #[error("Expected envelope subtype '{expected}', got '{actual}'")]
    WrongEnvelopeSubType { expected: String, actual: String },

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Unexpected signature count: expected {expected}, got {actual}")]
    SignatureCount { expected: String, actual: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------
    #[error("Invalid signature by {identity}")]
    InvalidSignature { identity: String },

    #[error("Envelope signatures failed to verify")]
    VerificationFailed,

    #[error("Content does not match the envelope digest")]
    ContentMismatch,

    // ------------------------------------------------------------------
    // Freshness / policy
    // ------------------------------------------------------------------
    #[error("Signature timestamp {timestamp_ms} is {skew_ms} ms from now, tolerance is {tolerance_ms} ms")]
    NotFresh {
        timestamp_ms: i64,
        skew_ms: i64,
        tolerance_ms: i64,
    },

    // ------------------------------------------------------------------
    // Lower layers
    // ------------------------------------------------------------------
    #[error("Crypto error: {0}")]
    CryptoError(#[from] notarius_crypto::Error),

    #[error("Key error: {0}")]
    KeyError(#[from] notarius_key::error::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::DigestAlreadySet
            | CoreError::ClaimDataAlreadySet
            | CoreError::MissingDigest
            | CoreError::AlreadyNotarized
            | CoreError::NotNotarized
            | CoreError::NoSignatures
            | CoreError::MalformedRecord(_)
            | CoreError::Config(_) => ErrorKind::Precondition,

            CoreError::EmptyContent
            | CoreError::EmptyClaimData
            | CoreError::InvalidClaimValue(_)
            | CoreError::InvalidIdentity { .. }
            | CoreError::EnvelopeTooSmall { .. }
            | CoreError::WrongEnvelopeType { .. }
            | CoreError::WrongEnvelopeSubType { .. }
            | CoreError::InvalidEnvelope(_)
            | CoreError::SignatureCount { .. }
            | CoreError::Serialization(_)
            | CoreError::Io(_) => ErrorKind::InvalidInput,

            CoreError::InvalidSignature { .. }
            | CoreError::VerificationFailed
            | CoreError::ContentMismatch => ErrorKind::Verification,

            CoreError::NotFresh { .. } => ErrorKind::Freshness,

            CoreError::CryptoError(_) | CoreError::KeyError(_) => ErrorKind::Crypto,
        }
    }
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
