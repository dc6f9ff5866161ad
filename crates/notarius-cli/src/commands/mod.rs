pub mod attest;
pub mod check_request;
pub mod generate;
pub mod notarize;
pub mod request;
pub mod sign;
pub mod verify;
