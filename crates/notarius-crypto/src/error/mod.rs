use thiserror::Error;

/// Error type for the crypto primitives
#[derive(Error, Debug)]
pub enum Error {
    #[error("Getrandom error: {0}")]
    GetrandomError(String),

    #[error("PKCS8 error: {0}")]
    Pkcs8Error(#[from] pkcs8::Error),

    #[error("SPKI error: {0}")]
    SpkiError(#[from] pkcs8::spki::Error),

    #[error("DER error: {0}")]
    DerError(#[from] pkcs8::der::Error),

    #[error("Elliptic curve error: {0}")]
    CurveError(#[from] p384::elliptic_curve::Error),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("JWK error: {0}")]
    JwkError(String),

    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: String, actual: usize },

    /// Anything without a dedicated variant
    #[error("Other error: {0}")]
    Other(String),
}

/// Result alias for the crypto primitives
pub type Result<T> = std::result::Result<T, Error>;
