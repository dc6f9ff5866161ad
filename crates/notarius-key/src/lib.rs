//! Signing key handles
//!
//! The envelope protocol signs through the [`KeySign`] trait and never touches
//! key material directly. [`P384Key`] is the in-process implementation,
//! loadable from plain or passphrase protected PKCS#8 PEM.

pub mod error;
pub mod key;

// Re-export core functionality
pub use key::{util::load_signing_key_from_pkcs8_pem, Algorithm, KeySign, P384Key};
