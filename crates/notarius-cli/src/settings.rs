//! Shared plumbing for the commands: policy, key and envelope files

use std::{fs, path::Path};

use notarius_core::{SignedEnvelope, TrustPolicy};
use notarius_key::{load_signing_key_from_pkcs8_pem, KeySign};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{CliError, CliResult};

/// Policy from `--config`, or the built-in defaults
pub fn load_policy(config: Option<&str>) -> CliResult<TrustPolicy> {
    match config {
        Some(path) => {
            ensure_exists(path)?;
            debug!(path, "loading trust policy");
            Ok(TrustPolicy::from_file(Path::new(path))?)
        }
        None => Ok(TrustPolicy::default()),
    }
}

/// Read a passphrase from the named environment variable
pub fn passphrase_from_env(var: Option<&str>) -> CliResult<Option<Zeroizing<Vec<u8>>>> {
    match var {
        Some(name) => {
            let value = std::env::var(name).map_err(|_| {
                CliError::InvalidInput(format!("environment variable {name} is not set"))
            })?;
            Ok(Some(Zeroizing::new(value.into_bytes())))
        }
        None => Ok(None),
    }
}

/// Load a PKCS#8 PEM signing key, decrypting it with the passphrase held in
/// `passphrase_env` when given
pub fn load_signer(path: &str, passphrase_env: Option<&str>) -> CliResult<Box<dyn KeySign>> {
    ensure_exists(path)?;
    let pem = Zeroizing::new(fs::read_to_string(path)?);
    let secret = passphrase_from_env(passphrase_env)?;
    let key = load_signing_key_from_pkcs8_pem(&pem, secret.as_ref().map(|s| s.as_slice()))?;
    debug!(path, key_id = %key.key_id_hex(), "signing key loaded");
    Ok(key)
}

pub fn read_envelope(path: &str) -> CliResult<SignedEnvelope> {
    ensure_exists(path)?;
    let json = fs::read_to_string(path)?;
    Ok(SignedEnvelope::from_json(&json)?)
}

/// Pretty JSON to `output`, or stdout
pub fn write_envelope(signed: &SignedEnvelope, output: Option<&str>) -> CliResult<()> {
    let json = signed.to_json_pretty()?;
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

pub fn ensure_exists(path: &str) -> CliResult<()> {
    if !Path::new(path).exists() {
        return Err(CliError::FileNotFound(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use notarius_key::P384Key;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_policy_default_and_file() {
        assert_eq!(load_policy(None).unwrap(), TrustPolicy::default());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("policy.toml");
        fs::write(&path, "authority = \"attest.example\"\n").unwrap();
        let policy = load_policy(path.to_str()).unwrap();
        assert_eq!(policy.authority.as_str(), "attest.example");

        assert!(matches!(
            load_policy(Some("/nonexistent/policy.toml")),
            Err(CliError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_load_signer_plain() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("signer.pem");
        let key = P384Key::generate().unwrap();
        key.save_to_file(&path, None).unwrap();

        let loaded = load_signer(path.to_str().unwrap(), None).unwrap();
        assert_eq!(loaded.key_id_hex(), key.key_id_hex());
    }

    #[test]
    fn test_missing_passphrase_variable() {
        assert!(matches!(
            passphrase_from_env(Some("NOTARIUS_TEST_SURELY_UNSET_VARIABLE")),
            Err(CliError::InvalidInput(_))
        ));
        assert!(passphrase_from_env(None).unwrap().is_none());
    }
}
