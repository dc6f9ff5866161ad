use std::{fs, path::Path};

use chrono::NaiveDate;
use colored::Colorize;
use notarius_core::{
    attestation::{self, Claim},
    value::claim_map_from_json,
    AttestationIssuer, DomainIdentity, RequestProtocol, SignedEnvelope,
};

use crate::{
    error::{CliError, CliResult},
    settings::{ensure_exists, load_policy, load_signer, write_envelope},
};

pub struct AttestArgs {
    pub key: String,
    pub passphrase_env: Option<String>,
    pub subject: Option<String>,
    pub claim: Option<String>,
    pub value: Option<String>,
    pub legal_name: Option<String>,
    pub request: Option<String>,
    pub output: Option<String>,
}

/// Build a claim from its wire name and a textual value
pub fn parse_claim(name: &str, value: Option<&str>, legal_name: Option<&str>) -> CliResult<Claim> {
    let required = || {
        value
            .map(str::to_string)
            .ok_or_else(|| CliError::InvalidInput(format!("--value is required for {name}")))
    };

    let claim = match name {
        attestation::CLAIM_IS_HUMAN => Claim::IsHuman,
        attestation::CLAIM_LEGAL_NAME => Claim::LegalName(required()?),
        attestation::CLAIM_SUBSET_LEGAL_NAME => match legal_name {
            Some(full) => Claim::subset_legal_name_of(full, &required()?)?,
            None => Claim::SubsetLegalName(required()?),
        },
        attestation::CLAIM_EMAIL_ADDRESS => Claim::EmailAddress(required()?),
        attestation::CLAIM_PHONE_NUMBER => Claim::PhoneNumber(required()?),
        attestation::CLAIM_NATIONALITY => Claim::Nationality(required()?),
        attestation::CLAIM_BIRTHDATE => {
            let raw = required()?;
            let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                CliError::InvalidInput(format!("birthdate '{raw}' is not YYYY-MM-DD: {e}"))
            })?;
            Claim::Birthdate(date)
        }
        attestation::CLAIM_RESIDENTIAL_ADDRESS => {
            let json: serde_json::Value = serde_json::from_str(&required()?)?;
            Claim::ResidentialAddress(claim_map_from_json(json)?)
        }
        other => return Err(CliError::InvalidInput(format!("unknown claim '{other}'"))),
    };
    Ok(claim)
}

pub fn handle(config: Option<&str>, args: AttestArgs) -> CliResult<()> {
    let policy = load_policy(config)?;
    let signer = load_signer(&args.key, args.passphrase_env.as_deref())?;
    let authority = policy.authority.clone();

    if let Some(request_path) = args.request.as_deref() {
        ensure_exists(request_path)?;
        let json = fs::read_to_string(request_path)?;
        let request = RequestProtocol::new(policy.clone()).verify_attestation_request(&json)?;
        println!(
            "{}",
            format!("Issuing attestations as {authority} from request...").cyan()
        );

        let issued = AttestationIssuer::new(policy, signer).issue_from_request(&request)?;
        return write_batch(&issued, args.output.as_deref());
    }

    let subject = args
        .subject
        .as_deref()
        .ok_or_else(|| CliError::InvalidInput("--subject is required".to_string()))?;
    let subject = DomainIdentity::parse(subject)?;
    let name = args
        .claim
        .as_deref()
        .ok_or_else(|| CliError::InvalidInput("--claim is required".to_string()))?;
    let claim = parse_claim(name, args.value.as_deref(), args.legal_name.as_deref())?;

    println!(
        "{}",
        format!("Attesting {} for {subject} as {authority}...", claim.key()).cyan()
    );
    let issued = AttestationIssuer::new(policy, signer).issue(&subject, claim)?;
    if let Ok(expires) = attestation::expiration_of(&issued) {
        println!("  Expires: {expires}");
    }
    println!("{} Attestation issued", "✓".green());

    write_envelope(&issued, args.output.as_deref())
}

/// One file per attestation, named after its claim, when `output` is a
/// directory; stdout otherwise
fn write_batch(issued: &[SignedEnvelope], output: Option<&str>) -> CliResult<()> {
    for envelope in issued {
        let claim = attestation::claim_of(envelope)
            .map(|(key, _)| key.to_string())
            .unwrap_or_else(|| "attestation".to_string());
        match output {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let path = Path::new(dir).join(format!("{claim}.json"));
                fs::write(&path, envelope.to_json_pretty()?)?;
                println!("{} {claim} saved to: {:?}", "✓".green(), path);
            }
            None => write_envelope(envelope, None)?,
        }
    }
    Ok(())
}
