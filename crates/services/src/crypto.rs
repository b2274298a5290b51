//! Cryptographic helper shared by the domain services.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Checksums and random tokens.
#[derive(Debug, Clone, Default)]
pub struct Crypto;

impl Crypto {
    /// Create the helper.
    pub fn new() -> Self {
        Self
    }

    /// Hex-encoded SHA-256 of `data`.
    pub fn digest(&self, data: &[u8]) -> String {
        format!("{:x}", Sha256::digest(data))
    }

    /// Checksum of a JSON document.
    ///
    /// Object keys serialize in sorted order, so equal documents always
    /// hash the same.
    pub fn checksum(&self, value: &serde_json::Value) -> String {
        self.digest(value.to_string().as_bytes())
    }

    /// URL-safe random token built from `bytes` random bytes.
    pub fn token(&self, bytes: usize) -> String {
        let mut buf = vec![0u8; bytes];
        rand::thread_rng().fill_bytes(&mut buf);
        URL_SAFE_NO_PAD.encode(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_matches_known_vector() {
        assert_eq!(
            Crypto::new().digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn checksum_ignores_key_order() {
        let crypto = Crypto::new();
        let a: serde_json::Value = serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
        assert_eq!(crypto.checksum(&a), crypto.checksum(&b));
        assert_ne!(crypto.checksum(&a), crypto.checksum(&json!({"a": 2})));
    }

    #[test]
    fn tokens_are_unique_and_sized() {
        let crypto = Crypto::new();
        let a = crypto.token(32);
        let b = crypto.token(32);
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }
}
