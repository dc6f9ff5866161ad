use colored::Colorize;
use notarius_core::{
    value::claim_map_from_json, ClaimMap, DomainIdentity, EnvelopeSubType, EnvelopeType,
    RequestProtocol,
};

use crate::{
    error::{CliError, CliResult},
    settings::{load_policy, load_signer, write_envelope},
};

pub struct RequestArgs {
    pub key: String,
    pub passphrase_env: Option<String>,
    pub identity: String,
    pub envelope_type: String,
    pub sub_type: String,
    pub data: Option<String>,
    pub output: Option<String>,
}

pub fn handle(config: Option<&str>, args: RequestArgs) -> CliResult<()> {
    let protocol = RequestProtocol::new(load_policy(config)?);
    let identity = DomainIdentity::parse(&args.identity)?;
    let signer = load_signer(&args.key, args.passphrase_env.as_deref())?;

    let data = match args.data.as_deref() {
        Some(raw) => claim_map_from_json(serde_json::from_str(raw)?)?,
        None => ClaimMap::new(),
    };

    let signed = match args.envelope_type.parse::<EnvelopeType>()? {
        EnvelopeType::Request => {
            protocol.create_request(&identity, signer.as_ref(), &args.sub_type, data)?
        }
        EnvelopeType::Instruction => match args.sub_type.as_str() {
            EnvelopeSubType::ATTESTATION => {
                protocol.create_attestation_request(&identity, signer.as_ref(), data)?
            }
            EnvelopeSubType::KEY_REGISTRATION => {
                protocol.create_key_registration(&identity, signer.as_ref(), data)?
            }
            other => {
                return Err(CliError::InvalidInput(format!(
                    "unknown instruction '{other}'"
                )))
            }
        },
        other => {
            return Err(CliError::InvalidInput(format!(
                "requests are 'request' or 'instruction' envelopes, got {other}"
            )))
        }
    };

    println!(
        "{} Created {} / {} from {}",
        "✓".green(),
        args.envelope_type,
        args.sub_type,
        identity
    );
    write_envelope(&signed, args.output.as_deref())
}

#[cfg(test)]
mod tests {
    use notarius_key::P384Key;
    use tempfile::TempDir;

    use super::*;
    use crate::settings::read_envelope;

    fn args(dir: &TempDir, envelope_type: &str, sub_type: &str) -> RequestArgs {
        let key = dir.path().join("alice.key.pem");
        P384Key::generate().unwrap().save_to_file(&key, None).unwrap();
        RequestArgs {
            key: key.to_str().unwrap().to_string(),
            passphrase_env: None,
            identity: "alice.example".to_string(),
            envelope_type: envelope_type.to_string(),
            sub_type: sub_type.to_string(),
            data: Some(r#"{"LegalName":"Alice Smith"}"#.to_string()),
            output: dir.path().join("request.json").to_str().map(String::from),
        }
    }

    #[test]
    fn test_create_attestation_request() {
        let dir = TempDir::new().unwrap();
        let args = args(&dir, "instruction", "attestation");
        let output = args.output.clone().unwrap();
        handle(None, args).unwrap();

        let json = std::fs::read_to_string(&output).unwrap();
        let protocol = RequestProtocol::new(Default::default());
        let verified = protocol.verify_attestation_request(&json).unwrap();
        assert_eq!(verified.signatures()[0].identity, "alice.example");
        assert!(read_envelope(&output).unwrap().verify_all().unwrap());
    }

    #[test]
    fn test_rejects_unknown_instruction_and_type() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            handle(None, args(&dir, "instruction", "launch")),
            Err(CliError::InvalidInput(_))
        ));
        assert!(matches!(
            handle(None, args(&dir, "document", "txt")),
            Err(CliError::InvalidInput(_))
        ));
    }
}
