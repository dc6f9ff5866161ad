use std::{fs, path::Path};

use colored::Colorize;
use notarius_key::{KeySign, P384Key};

use crate::{error::CliResult, settings::passphrase_from_env};

pub fn handle(name: String, output: Option<String>, passphrase_env: Option<String>) -> CliResult<()> {
    println!("{}", "Generating P-384 key pair...".cyan());

    let key = P384Key::generate()?;
    let secret = passphrase_from_env(passphrase_env.as_deref())?;

    let output_dir = output.unwrap_or_else(|| ".".to_string());
    let output_path = Path::new(&output_dir);
    if !output_path.exists() {
        fs::create_dir_all(output_path)?;
    }

    let private_key_path = output_path.join(format!("{name}.key.pem"));
    key.save_to_file(&private_key_path, secret.as_ref().map(|s| s.as_slice()))?;
    let protection = if secret.is_some() {
        "encrypted"
    } else {
        "unencrypted"
    };
    println!(
        "{} Private key ({protection}) saved to: {:?}",
        "✓".green(),
        private_key_path
    );

    let public_key_path = output_path.join(format!("{name}.pub.pem"));
    fs::write(&public_key_path, key.to_spki_pem()?)?;
    println!("{} Public key saved to: {:?}", "✓".green(), public_key_path);

    let portable = key.public_key_portable()?;
    let jwk_path = output_path.join(format!("{name}.jwk"));
    fs::write(&jwk_path, &portable)?;
    println!("{} Portable public key saved to: {:?}", "✓".green(), jwk_path);

    println!();
    println!("{}", "Key information:".cyan());
    println!("  Algorithm: {}", key.algorithm().name());
    println!("  Key ID: {}", key.key_id_hex());
    println!("  Portable: {portable}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::settings::load_signer;

    #[test]
    fn test_generate_writes_key_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("keys");
        handle("alice".into(), out.to_str().map(String::from), None).unwrap();

        let pem = out.join("alice.key.pem");
        assert!(pem.exists());
        assert!(out.join("alice.pub.pem").exists());

        let loaded = load_signer(pem.to_str().unwrap(), None).unwrap();
        let portable = fs::read_to_string(out.join("alice.jwk")).unwrap();
        assert_eq!(loaded.public_key_portable().unwrap(), portable);
    }
}
