//! # Notarius
//!
//! Signed envelopes, attestations and notarization
//!
//! ## Crates
//!
//! - `notarius_crypto` - P-384 ECDSA, SHA-256, randomness and portable key encodings
//! - `notarius_key` - signing key handles
//! - `notarius_core` - envelopes, signature records, notary seal, attestation
//!   issuer and request protocol
//! - `notarius-cli` - the `notarius` command line tool

// Re-export all library crates
pub use notarius_core;
pub use notarius_crypto;
pub use notarius_key;

pub use notarius_core::{
    AttestationIssuer, Envelope, EnvelopeType, NotaryService, RequestProtocol, SignedEnvelope,
    TrustPolicy,
};
