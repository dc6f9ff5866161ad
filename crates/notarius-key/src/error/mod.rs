use thiserror::Error;

/// Error type for key handles
#[derive(Error, Debug)]
pub enum Error {
    #[error("Key error: {0}")]
    KeyError(String),

    #[error("Signature error: {0}")]
    SignatureError(String),

    /// Import failed: bad PEM, wrong curve, or wrong secret
    #[error("Import error: {0}")]
    ImportError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Crypto error: {0}")]
    CryptoError(#[from] notarius_crypto::Error),
}

/// Result alias for key handle operations
pub type Result<T> = std::result::Result<T, Error>;
