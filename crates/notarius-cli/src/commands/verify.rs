use std::fs;

use chrono::DateTime;
use colored::Colorize;
use notarius_core::SignatureRecord;

use crate::{
    error::{CliError, CliResult},
    settings::{ensure_exists, read_envelope},
};

fn describe(record: &SignatureRecord) -> String {
    let when = DateTime::from_timestamp_millis(record.time_stamp)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| record.time_stamp.to_string());
    format!("{} at {when}", record.identity)
}

pub fn handle(envelope: String, content: Option<String>) -> CliResult<()> {
    println!("{}", format!("Verifying envelope: {envelope}").cyan());
    let signed = read_envelope(&envelope)?;

    let inner = signed.envelope();
    println!("  State: {:?}", signed.state());
    if let Some(envelope_type) = inner.envelope_type() {
        let sub_type = inner
            .envelope_sub_type()
            .map(|s| s.as_str())
            .unwrap_or_default();
        println!("  Type: {envelope_type} / {sub_type}");
    }
    println!("  Content length: {} bytes", inner.content_length());

    if !signed.verify_all()? {
        println!("{} {}", "✗".red(), "Signature verification failed".red().bold());
        return Err(CliError::Rejected(
            "one or more signatures do not verify".to_string(),
        ));
    }

    println!();
    println!("{}", "Signers:".cyan());
    for record in signed.signatures() {
        println!("  {} {}", "✓".green(), describe(record));
    }
    if let Some(notary) = signed.notary() {
        println!("{}", "Notary:".cyan());
        println!("  {} {}", "✓".green(), describe(notary));
    }

    if let Some(path) = content {
        ensure_exists(&path)?;
        let data = fs::read(&path)?;
        if !inner.matches_content(&data) {
            println!("{} {}", "✗".red(), "Content does not match envelope".red().bold());
            return Err(CliError::Rejected(format!("{path} does not match the envelope")));
        }
        println!("{} Content matches: {path}", "✓".green());
    }

    println!("{} {}", "✓".green(), "Envelope verified".green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use notarius_core::{DomainIdentity, Envelope, EnvelopeType, SignedEnvelope};
    use notarius_key::P384Key;
    use tempfile::TempDir;

    use super::*;

    fn write_signed(dir: &TempDir, content: &[u8]) -> String {
        let envelope = Envelope::for_content(content, EnvelopeType::Document, "txt").unwrap();
        let mut signed = SignedEnvelope::new(envelope).unwrap();
        signed
            .add_signature(
                &DomainIdentity::parse("alice.example").unwrap(),
                &P384Key::generate().unwrap(),
            )
            .unwrap();
        let path = dir.path().join("signed.json");
        fs::write(&path, signed.to_json_pretty().unwrap()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_verify_with_content() {
        let dir = TempDir::new().unwrap();
        let envelope = write_signed(&dir, b"hello notary");
        let good = dir.path().join("good.txt");
        let bad = dir.path().join("bad.txt");
        fs::write(&good, b"hello notary").unwrap();
        fs::write(&bad, b"hello notarY").unwrap();

        handle(envelope.clone(), None).unwrap();
        handle(envelope.clone(), good.to_str().map(String::from)).unwrap();
        assert!(matches!(
            handle(envelope, bad.to_str().map(String::from)),
            Err(CliError::Rejected(_))
        ));
    }

    #[test]
    fn test_verify_rejects_tampered_signature() {
        let dir = TempDir::new().unwrap();
        let path = write_signed(&dir, b"hello notary");
        let mut json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        json["Signatures"][0]["Identity"] = serde_json::Value::from("mallory.example");
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(handle(path, None), Err(CliError::Rejected(_))));
    }
}
