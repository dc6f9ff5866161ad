//! Notarius core protocol
//!
//! Content descriptors, per-signer signature records, the multi-signature
//! aggregate with its notary seal, and the policy layers built on top of it:
//! attestation issuance, request / instruction envelopes and notarization.

pub mod attestation;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod notary;
pub mod request;
pub mod shared;
pub mod signature;
pub mod signed;
pub mod value;

mod wire;

// Re-export commonly used types
pub use attestation::{AttestationIssuer, Claim};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::TrustPolicy;
pub use envelope::{Envelope, EnvelopeSubType, EnvelopeType};
pub use error::{CoreError, ErrorKind, Result};
pub use identity::DomainIdentity;
pub use notary::NotaryService;
pub use request::RequestProtocol;
pub use shared::SharedSignedEnvelope;
pub use signature::SignatureRecord;
pub use signed::{EnvelopeState, SignedEnvelope};
pub use value::{canonical_stringify, ClaimMap, ClaimValue};
