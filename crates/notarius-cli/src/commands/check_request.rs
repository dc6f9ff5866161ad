use std::fs;

use colored::Colorize;
use notarius_core::{request::requester_of, EnvelopeSubType, EnvelopeType, RequestProtocol};

use crate::{
    error::CliResult,
    settings::{ensure_exists, load_policy},
};

/// Run the full request verification pipeline over an envelope file
pub fn handle(
    config: Option<&str>,
    envelope: String,
    envelope_type: String,
    sub_type: String,
) -> CliResult<()> {
    let protocol = RequestProtocol::new(load_policy(config)?);
    ensure_exists(&envelope)?;
    let json = fs::read_to_string(&envelope)?;
    let expected: EnvelopeType = envelope_type.parse()?;

    println!(
        "{}",
        format!("Checking {expected} / {sub_type}: {envelope}").cyan()
    );
    let verified = if expected == EnvelopeType::Instruction
        && sub_type == EnvelopeSubType::KEY_REGISTRATION
    {
        protocol.verify_key_registration(&json)?
    } else {
        protocol.verify(&json, expected, &sub_type)?
    };
    let requester = requester_of(&verified)?;

    println!("{} {}", "✓".green(), "Request accepted".green().bold());
    println!("  Requester: {requester}");
    println!("  Signatures: {}", verified.signatures().len());
    Ok(())
}
