//! Shopify webhook signature verification.
//!
//! Shopify signs every webhook with HMAC-SHA256 over the exact raw request
//! body, keyed with the app's shared secret, and sends the digest in the
//! `X-Shopify-Hmac-Sha256` header.
//! Reference: https://shopify.dev/docs/apps/build/webhooks/subscribe/https#step-2-validate-the-origin-of-your-webhook-to-ensure-its-coming-from-shopify

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Wire encoding of the signature header.
///
/// Which one applies is a property of the integrated webhook source and is
/// chosen by configuration, never guessed from the header value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureEncoding {
    #[default]
    Base64,
    Hex,
}

impl FromStr for SignatureEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            other => Err(format!("unknown signature encoding: {}", other)),
        }
    }
}

impl fmt::Display for SignatureEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64 => f.write_str("base64"),
            Self::Hex => f.write_str("hex"),
        }
    }
}

/// Verify a webhook signature.
///
/// # Arguments
///
/// * `raw_body` - The request body exactly as received, before any parsing
/// * `signature_header` - The signature header value, if present
/// * `shared_secret` - The signing secret shared with the webhook source
/// * `encoding` - How the header encodes the digest
///
/// # Returns
///
/// `true` only if the header decodes to the HMAC-SHA256 of `raw_body`. A
/// missing header, empty secret, undecodable header and digest mismatch all
/// return `false` with no further distinction.
pub fn verify(
    raw_body: &[u8],
    signature_header: Option<&str>,
    shared_secret: &str,
    encoding: SignatureEncoding,
) -> bool {
    let header = match signature_header.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => {
            debug!("signature_header_missing");
            return false;
        }
    };

    if shared_secret.is_empty() {
        debug!("signature_secret_missing");
        return false;
    }

    let provided = match decode(header, encoding) {
        Some(bytes) => bytes,
        None => {
            debug!(encoding = %encoding, header_length = header.len(), "signature_decode_failed");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(shared_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(raw_body);

    // verify_slice compares in constant time
    let valid = mac.verify_slice(&provided).is_ok();
    if !valid {
        debug!(provided_length = provided.len(), "signature_mismatch");
    }
    valid
}

/// Compute the signature a webhook source would send for `raw_body`.
pub fn sign(raw_body: &[u8], shared_secret: &str, encoding: SignatureEncoding) -> String {
    let mut mac = HmacSha256::new_from_slice(shared_secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(raw_body);
    let digest = mac.finalize().into_bytes();

    match encoding {
        SignatureEncoding::Base64 => STANDARD.encode(digest),
        SignatureEncoding::Hex => hex::encode(digest),
    }
}

fn decode(header: &str, encoding: SignatureEncoding) -> Option<Vec<u8>> {
    match encoding {
        SignatureEncoding::Base64 => STANDARD.decode(header).ok(),
        SignatureEncoding::Hex => hex::decode(header.trim_start_matches("sha256=")).ok(),
    }
}

/// Return the secret if it is configured and not blank.
pub fn configured_secret(secret: &Option<String>) -> Option<&str> {
    secret
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-shared-secret";
    const BODY: &[u8] = br#"{"shop_id":123456,"shop_domain":"test.myshopify.com"}"#;

    #[test]
    fn test_verify_valid_base64() {
        let signature = sign(BODY, SECRET, SignatureEncoding::Base64);
        assert!(verify(BODY, Some(&signature), SECRET, SignatureEncoding::Base64));
    }

    #[test]
    fn test_verify_valid_hex() {
        let signature = sign(BODY, SECRET, SignatureEncoding::Hex);
        assert!(verify(BODY, Some(&signature), SECRET, SignatureEncoding::Hex));

        let prefixed = format!("sha256={}", signature);
        assert!(verify(BODY, Some(&prefixed), SECRET, SignatureEncoding::Hex));
    }

    #[test]
    fn test_verify_known_vector() {
        // RFC 4231 test case 2
        let signature = "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843";
        assert!(verify(
            b"what do ya want for nothing?",
            Some(signature),
            "Jefe",
            SignatureEncoding::Hex
        ));
    }

    #[test]
    fn test_verify_empty_body() {
        let signature = sign(b"", SECRET, SignatureEncoding::Base64);
        assert!(verify(b"", Some(&signature), SECRET, SignatureEncoding::Base64));
    }

    #[test]
    fn test_verify_missing_header() {
        assert!(!verify(BODY, None, SECRET, SignatureEncoding::Base64));
        assert!(!verify(BODY, Some(""), SECRET, SignatureEncoding::Base64));
        assert!(!verify(BODY, Some("   "), SECRET, SignatureEncoding::Hex));
    }

    #[test]
    fn test_verify_empty_secret() {
        let signature = sign(BODY, "", SignatureEncoding::Base64);
        assert!(!verify(BODY, Some(&signature), "", SignatureEncoding::Base64));
    }

    #[test]
    fn test_verify_undecodable_header() {
        assert!(!verify(BODY, Some("%%%not base64%%%"), SECRET, SignatureEncoding::Base64));
        assert!(!verify(BODY, Some("zz-not-hex"), SECRET, SignatureEncoding::Hex));
    }

    #[test]
    fn test_verify_wrong_encoding_selected() {
        let hex_signature = sign(BODY, SECRET, SignatureEncoding::Hex);
        assert!(!verify(BODY, Some(&hex_signature), SECRET, SignatureEncoding::Base64));
    }

    #[test]
    fn test_verify_wrong_secret_or_body() {
        let signature = sign(BODY, SECRET, SignatureEncoding::Base64);
        assert!(!verify(BODY, Some(&signature), "other-secret", SignatureEncoding::Base64));
        assert!(!verify(b"{}", Some(&signature), SECRET, SignatureEncoding::Base64));
    }

    #[test]
    fn test_verify_rejects_every_single_bit_flip() {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(BODY);
        let digest = mac.finalize().into_bytes().to_vec();

        for byte in 0..digest.len() {
            for bit in 0..8 {
                let mut mutated = digest.clone();
                mutated[byte] ^= 1 << bit;
                let header = STANDARD.encode(&mutated);
                assert!(!verify(BODY, Some(&header), SECRET, SignatureEncoding::Base64));
            }
        }
    }

    #[test]
    fn test_verify_rejects_truncated_digest() {
        let signature = sign(BODY, SECRET, SignatureEncoding::Hex);
        assert!(!verify(BODY, Some(&signature[..62]), SECRET, SignatureEncoding::Hex));
    }

    #[test]
    fn test_signature_encoding_from_str() {
        assert_eq!("base64".parse::<SignatureEncoding>(), Ok(SignatureEncoding::Base64));
        assert_eq!(" HEX ".parse::<SignatureEncoding>(), Ok(SignatureEncoding::Hex));
        assert!("sha256".parse::<SignatureEncoding>().is_err());
        assert_eq!(SignatureEncoding::default(), SignatureEncoding::Base64);
    }

    #[test]
    fn test_configured_secret() {
        assert_eq!(configured_secret(&None), None);
        assert_eq!(configured_secret(&Some("".to_string())), None);
        assert_eq!(configured_secret(&Some("   ".to_string())), None);
        assert_eq!(configured_secret(&Some("key123".to_string())), Some("key123"));
    }
}
