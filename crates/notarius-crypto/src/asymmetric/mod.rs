//! Asymmetric cryptography algorithms
//!
//! The envelope protocol fixes a single curve/hash combination for every
//! signature it produces, so only P-384 lives here.

pub mod p384;

pub use self::p384::{verify, P384, SIGNATURE_ALGORITHM};
