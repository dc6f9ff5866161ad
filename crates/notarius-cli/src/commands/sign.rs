use std::{fs::File, io::BufReader};

use colored::Colorize;
use notarius_core::{Clock, DomainIdentity, Envelope, EnvelopeType, SignedEnvelope, SystemClock};

use crate::{
    error::{CliError, CliResult},
    settings::{ensure_exists, load_signer, read_envelope, write_envelope},
};

pub struct SignArgs {
    pub file: Option<String>,
    pub envelope: Option<String>,
    pub key: String,
    pub passphrase_env: Option<String>,
    pub identity: String,
    pub envelope_type: String,
    pub sub_type: String,
    pub output: Option<String>,
}

/// Start a document/contract envelope over a file, or co-sign an existing one
pub fn handle(args: SignArgs) -> CliResult<()> {
    let identity = DomainIdentity::parse(&args.identity)?;
    let signer = load_signer(&args.key, args.passphrase_env.as_deref())?;

    let mut signed = match (args.envelope.as_deref(), args.file.as_deref()) {
        (Some(path), _) => {
            println!("{}", format!("Co-signing envelope: {path}").cyan());
            read_envelope(path)?
        }
        (None, Some(file)) => {
            println!("{}", format!("Creating envelope for: {file}").cyan());
            let envelope_type: EnvelopeType = args.envelope_type.parse()?;
            if !matches!(envelope_type, EnvelopeType::Document | EnvelopeType::Contract) {
                return Err(CliError::InvalidInput(format!(
                    "only document or contract envelopes can be created here, got {envelope_type}"
                )));
            }
            ensure_exists(file)?;
            let reader = BufReader::new(File::open(file)?);
            let mut envelope = Envelope::new();
            envelope.compute_digest_from_reader(
                reader,
                envelope_type,
                args.sub_type.as_str(),
                SystemClock.now_millis(),
            )?;
            println!("  Content length: {} bytes", envelope.content_length());
            SignedEnvelope::new(envelope)?
        }
        (None, None) => {
            return Err(CliError::InvalidInput(
                "either --file or --envelope is required".to_string(),
            ))
        }
    };

    signed.add_signature(&identity, signer.as_ref())?;
    println!(
        "{} Signed as {} ({} signature(s))",
        "✓".green(),
        identity,
        signed.signatures().len()
    );

    write_envelope(&signed, args.output.as_deref())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use notarius_core::EnvelopeState;
    use notarius_key::P384Key;
    use tempfile::TempDir;

    use super::*;

    fn key_file(dir: &TempDir, name: &str) -> String {
        let path = dir.path().join(format!("{name}.key.pem"));
        P384Key::generate().unwrap().save_to_file(&path, None).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn args(dir: &TempDir) -> SignArgs {
        let content = dir.path().join("contract.txt");
        fs::write(&content, "The parties agree.").unwrap();
        SignArgs {
            file: Some(content.to_str().unwrap().to_string()),
            envelope: None,
            key: key_file(dir, "alice"),
            passphrase_env: None,
            identity: "alice.example".to_string(),
            envelope_type: "contract".to_string(),
            sub_type: "txt".to_string(),
            output: Some(dir.path().join("signed.json").to_str().unwrap().to_string()),
        }
    }

    #[test]
    fn test_sign_then_cosign() {
        let dir = TempDir::new().unwrap();
        let first = args(&dir);
        let out = first.output.clone().unwrap();
        handle(first).unwrap();

        let cosign = SignArgs {
            file: None,
            envelope: Some(out.clone()),
            key: key_file(&dir, "bob"),
            identity: "bob.example".to_string(),
            ..args(&dir)
        };
        handle(cosign).unwrap();

        let signed = read_envelope(&out).unwrap();
        assert_eq!(signed.state(), EnvelopeState::PartiallySigned);
        assert_eq!(signed.signatures().len(), 2);
        assert!(signed.verify_all().unwrap());
        let content = fs::read(dir.path().join("contract.txt")).unwrap();
        assert!(signed.envelope().matches_content(&content));
    }

    #[test]
    fn test_sign_rejects_request_type() {
        let dir = TempDir::new().unwrap();
        let bad = SignArgs {
            envelope_type: "request".to_string(),
            ..args(&dir)
        };
        assert!(matches!(handle(bad), Err(CliError::InvalidInput(_))));
    }
}
