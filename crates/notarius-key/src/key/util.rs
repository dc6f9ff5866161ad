use std::convert::TryFrom;

use const_oid::ObjectIdentifier;
use pkcs8::{
    der::pem::PemLabel, spki::der::asn1::AnyRef, EncryptedPrivateKeyInfo, PrivateKeyInfo,
    SecretDocument,
};

use super::{p384::P384Key, KeySign};
use crate::error::{Error, Result};

/// Load a signing key handle from PKCS#8 PEM.
///
/// Both `PRIVATE KEY` and `ENCRYPTED PRIVATE KEY` documents are accepted; the
/// latter needs `secret`. Only P-384 EC keys are usable by the protocol, any
/// other algorithm or curve is rejected up front.
pub fn load_signing_key_from_pkcs8_pem(
    pem: &str,
    secret: Option<&[u8]>,
) -> Result<Box<dyn KeySign>> {
    let (label, doc) = SecretDocument::from_pem(pem)
        .map_err(|e| Error::ImportError(format!("Failed to decode PEM: {e}")))?;

    if label == EncryptedPrivateKeyInfo::PEM_LABEL {
        let secret = secret.ok_or_else(|| {
            Error::ImportError("Key is encrypted but no secret was supplied".to_string())
        })?;
        let key = P384Key::from_encrypted_pem(pem, secret)?;
        return Ok(Box::new(key));
    }

    if label != PrivateKeyInfo::PEM_LABEL {
        return Err(Error::ImportError(format!("Invalid PKCS#8 label: {label}")));
    }

    let info = PrivateKeyInfo::try_from(doc.as_bytes())
        .map_err(|e| Error::ImportError(format!("Failed to parse PKCS#8: {e}")))?;
    ensure_p384(&info)?;

    let key = P384Key::from_pkcs8_der(doc.as_bytes())?;
    Ok(Box::new(key))
}

fn ensure_p384(info: &PrivateKeyInfo<'_>) -> Result<()> {
    let oid = info.algorithm.oid;

    if oid != const_oid::db::rfc5912::ID_EC_PUBLIC_KEY {
        return Err(Error::ImportError(format!(
            "Unsupported signing algorithm OID: {}",
            oid
        )));
    }

    let params = info.algorithm.parameters.ok_or_else(|| {
        Error::ImportError("EC key is missing curve parameters".to_string())
    })?;
    let curve_oid = parse_curve_oid(params)?;
    if curve_oid != const_oid::db::rfc5912::SECP_384_R_1 {
        return Err(Error::ImportError(format!(
            "Unsupported EC curve OID: {curve_oid}"
        )));
    }
    Ok(())
}

fn parse_curve_oid(any: AnyRef<'_>) -> Result<ObjectIdentifier> {
    ObjectIdentifier::try_from(any)
        .map_err(|e| Error::ImportError(format!("Failed to parse curve OID: {e}")))
}
