//! Hashing and HMAC utilities.
//!
//! Stateless helpers used for content fingerprints and webhook-style
//! signatures. All outputs are lowercase hex.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 digest of a value, hex-encoded.
pub fn sha256_hex(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest)
}

/// HMAC-SHA256 signature of a message under a secret, hex-encoded.
pub fn hmac_sha256_hex(message: &str, secret: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        unreachable!("HMAC-SHA256 accepts keys of any length");
    };

    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify an HMAC-SHA256 signature in constant time.
///
/// Returns `false` for signatures that are not valid hex as well as for
/// signatures that do not match.
pub fn verify_hmac_sha256(message: &str, secret: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        unreachable!("HMAC-SHA256 accepts keys of any length");
    };

    mac.update(message.as_bytes());
    mac.verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_deterministic() {
        assert_eq!(sha256_hex("hello"), sha256_hex("hello"));
        assert_ne!(sha256_hex("hello"), sha256_hex("hello!"));
    }

    #[test]
    fn sha256_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hmac_round_trip() {
        let signature = hmac_sha256_hex("payload", b"secret");
        assert!(verify_hmac_sha256("payload", b"secret", &signature));
    }

    #[test]
    fn hmac_rejects_wrong_secret() {
        let signature = hmac_sha256_hex("payload", b"secret");
        assert!(!verify_hmac_sha256("payload", b"other", &signature));
    }

    #[test]
    fn hmac_rejects_tampered_message() {
        let signature = hmac_sha256_hex("payload", b"secret");
        assert!(!verify_hmac_sha256("payload!", b"secret", &signature));
    }

    #[test]
    fn hmac_rejects_non_hex_signature() {
        assert!(!verify_hmac_sha256("payload", b"secret", "not-hex"));
    }

    #[test]
    fn hmac_rejects_truncated_signature() {
        let signature = hmac_sha256_hex("payload", b"secret");
        assert!(!verify_hmac_sha256("payload", b"secret", &signature[..16]));
    }
}
