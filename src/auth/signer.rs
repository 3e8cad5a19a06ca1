//! API key request signing
//!
//! Keys are Ed25519 seeds stored base64 encoded between armour lines.
//! A signed request carries:
//! - `X-Timestamp`: RFC 3339 signing time
//! - `X-Content-Hash`: base64 SHA-256 of the body
//! - `X-Key-Id`: caller-chosen key name
//! - `X-Key`: base64 public key
//! - `X-Authorization`: base64 signature over
//!   `METHOD\nURL\nTIMESTAMP\nCONTENT_HASH`

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use super::AuthError;
use crate::host::HttpRequest;

/// Armour label of generated keys
const KEY_LABEL: &str = "ED25519 PRIVATE KEY";

/// Signs requests with API key material
pub trait RequestSigner: Send + Sync {
    fn sign_request(&self, request: &mut HttpRequest, key_id: &str, key: &[u8]) -> Result<(), AuthError>;
}

/// Default signer for Ed25519 API keys
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519RequestSigner;

impl RequestSigner for Ed25519RequestSigner {
    fn sign_request(&self, request: &mut HttpRequest, key_id: &str, key: &[u8]) -> Result<(), AuthError> {
        let signing_key = parse_signing_key(key)?;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let content_hash = BASE64.encode(Sha256::digest(&request.body));

        let message = signed_message(request, &timestamp, &content_hash);
        let signature = signing_key.sign(message.as_bytes());

        request.set_header("X-Timestamp", timestamp);
        request.set_header("X-Content-Hash", content_hash);
        request.set_header("X-Key-Id", key_id);
        request.set_header("X-Key", BASE64.encode(signing_key.verifying_key().to_bytes()));
        request.set_header("X-Authorization", BASE64.encode(signature.to_bytes()));
        Ok(())
    }
}

/// Canonical text covered by the signature
pub(crate) fn signed_message(request: &HttpRequest, timestamp: &str, content_hash: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        request.method,
        request.full_url(),
        timestamp,
        content_hash
    )
}

/// Parse armoured or bare base64 key material
pub fn parse_signing_key(key: &[u8]) -> Result<SigningKey, AuthError> {
    let text = std::str::from_utf8(key)
        .map_err(|_| AuthError::InvalidKey("key is not valid UTF-8".to_string()))?;

    let encoded: String = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();
    if encoded.is_empty() {
        return Err(AuthError::InvalidKey("key is empty".to_string()));
    }

    let bytes = BASE64.decode(encoded)?;
    let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        AuthError::InvalidKey(format!("expected 32 key bytes, got {}", bytes.len()))
    })?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Generate a new armoured API key
pub fn generate_api_key() -> String {
    let key = SigningKey::generate(&mut OsRng);
    format!(
        "-----BEGIN {label}-----\n{}\n-----END {label}-----\n",
        BASE64.encode(key.to_bytes()),
        label = KEY_LABEL
    )
}

/// SHA-256 fingerprint of a public key (hex-encoded)
pub fn key_fingerprint(key: &VerifyingKey) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    #[test]
    fn test_generated_key_parses() {
        let pem = generate_api_key();
        assert!(pem.starts_with("-----BEGIN ED25519 PRIVATE KEY-----\n"));
        let key = parse_signing_key(pem.as_bytes()).unwrap();
        assert_eq!(key_fingerprint(&key.verifying_key()).len(), 64);
    }

    #[test]
    fn test_bare_base64_key_parses() {
        let encoded = BASE64.encode([7u8; 32]);
        let key = parse_signing_key(encoded.as_bytes()).unwrap();
        assert_eq!(key.to_bytes(), [7u8; 32]);
    }

    #[test]
    fn test_malformed_keys_rejected() {
        assert!(matches!(parse_signing_key(b""), Err(AuthError::InvalidKey(_))));
        assert!(matches!(parse_signing_key(b"!!!"), Err(AuthError::KeyEncoding(_))));
        let short = BASE64.encode([1u8; 16]);
        assert!(matches!(
            parse_signing_key(short.as_bytes()),
            Err(AuthError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_signature_verifies() {
        let pem = generate_api_key();
        let mut request = HttpRequest::get("https://api.example.com/application/v4/x");
        request.set_query("after", "-1");
        Ed25519RequestSigner
            .sign_request(&mut request, "t1.a1.default", pem.as_bytes())
            .unwrap();

        let timestamp = request.header("X-Timestamp").unwrap().to_string();
        let content_hash = request.header("X-Content-Hash").unwrap().to_string();
        assert_eq!(content_hash, BASE64.encode(Sha256::digest(b"")));

        let public: [u8; 32] = BASE64
            .decode(request.header("X-Key").unwrap())
            .unwrap()
            .try_into()
            .unwrap();
        let verifying_key = VerifyingKey::from_bytes(&public).unwrap();
        let signature_bytes = BASE64.decode(request.header("X-Authorization").unwrap()).unwrap();
        let signature = Signature::from_slice(&signature_bytes).unwrap();

        let message = signed_message(&request, &timestamp, &content_hash);
        assert!(message.contains("?after=-1"));
        assert!(verifying_key.verify(message.as_bytes(), &signature).is_ok());
    }
}
