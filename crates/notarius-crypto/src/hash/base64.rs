//! Base64 utilities for the envelope wire format
//!
//! - `encode()` / `decode()` - standard alphabet with padding (byte fields in
//!   envelope JSON)
//! - `encode_url_safe_no_pad()` / `decode_url_safe_no_pad()` - URL-safe alphabet
//!   without padding (portable public keys, JWK coordinates)
//!
//! ## Examples
//! ```
//! use notarius_crypto::base64;
//!
//! let encoded = base64::encode(b"Hello, World!");
//! assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
//! assert_eq!(base64::decode(&encoded).unwrap(), b"Hello, World!");
//! ```

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};

use crate::error::Result;

/// Encode bytes to standard base64 string with padding
pub fn encode<T: AsRef<[u8]>>(data: T) -> String {
    STANDARD.encode(data)
}

/// Decode standard base64 string to bytes
pub fn decode<T: AsRef<[u8]>>(encoded: T) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(encoded)?)
}

/// Encode bytes to URL-safe base64 string without padding
///
/// Uses the URL-safe alphabet: `A-Z`, `a-z`, `0-9`, `-`, `_`
pub fn encode_url_safe_no_pad<T: AsRef<[u8]>>(data: T) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode URL-safe base64 string without padding to bytes
pub fn decode_url_safe_no_pad<T: AsRef<[u8]>>(encoded: T) -> Result<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(encoded)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_url_safe_no_pad() {
        // 0xfb 0xff produce '+' and '/' in the standard alphabet
        let data = [0xfbu8, 0xff, 0xfe];
        let encoded = encode_url_safe_no_pad(data);
        assert_eq!(encoded, "-__-");
        assert!(!encoded.contains('='));
        assert_eq!(decode_url_safe_no_pad(&encoded).unwrap(), data);
    }

    #[test]
    fn test_invalid_input() {
        assert!(decode("not base64!").is_err());
        assert!(decode_url_safe_no_pad("a+b/").is_err());
    }
}
