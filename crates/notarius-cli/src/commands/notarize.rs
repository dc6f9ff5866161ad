use colored::Colorize;
use notarius_core::NotaryService;

use crate::{
    error::CliResult,
    settings::{load_policy, load_signer, read_envelope, write_envelope},
};

pub fn handle(
    config: Option<&str>,
    envelope: String,
    key: String,
    passphrase_env: Option<String>,
    output: Option<String>,
) -> CliResult<()> {
    let policy = load_policy(config)?;
    let signed = read_envelope(&envelope)?;
    let signer = load_signer(&key, passphrase_env.as_deref())?;

    println!(
        "{}",
        format!("Notarizing as {}...", policy.notary).cyan()
    );
    let service = NotaryService::new(policy, signer);
    let sealed = service.notarize(signed)?;

    println!(
        "{} Sealed {} signature(s)",
        "✓".green(),
        sealed.signatures().len()
    );
    write_envelope(&sealed, output.as_deref())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use notarius_core::{DomainIdentity, Envelope, EnvelopeState, EnvelopeType, SignedEnvelope};
    use notarius_key::P384Key;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_notarize_envelope_file() {
        let dir = TempDir::new().unwrap();
        let envelope = Envelope::for_content(b"lease", EnvelopeType::Contract, "pdf").unwrap();
        let mut signed = SignedEnvelope::new(envelope).unwrap();
        signed
            .add_signature(
                &DomainIdentity::parse("alice.example").unwrap(),
                &P384Key::generate().unwrap(),
            )
            .unwrap();
        let input = dir.path().join("signed.json");
        fs::write(&input, signed.to_json().unwrap()).unwrap();

        let notary_key = dir.path().join("notary.key.pem");
        P384Key::generate().unwrap().save_to_file(&notary_key, None).unwrap();
        let output = dir.path().join("sealed.json");

        handle(
            None,
            input.to_str().unwrap().to_string(),
            notary_key.to_str().unwrap().to_string(),
            None,
            output.to_str().map(String::from),
        )
        .unwrap();

        let sealed = read_envelope(output.to_str().unwrap()).unwrap();
        assert_eq!(sealed.state(), EnvelopeState::Notarized);
        assert!(sealed.verify_all().unwrap());
    }
}
