//! Portable public key encodings
//!
//! Signature records carry the signer's public key as text. The protocol's
//! preferred form is a base64url JWK; SPKI DER is accepted as an alternative.

pub mod jwk;

pub use jwk::{
    public_key_from_portable, public_key_to_jwk_base64url, verify_portable, EcJwk,
};
