//! Message envelopes using `XChaCha20-Poly1305`.
//!
//! Seal and open are pure; random nonce bytes must be provided by the
//! caller. This keeps the codec deterministic under test and pushes all
//! entropy decisions to the session's environment.

use base64::{Engine, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{error::DecryptError, secret::SessionSecret};

/// Version prefix of the sealed envelope text format.
pub const ENVELOPE_PREFIX: &str = "mw1";

/// Size of the `XChaCha20` nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes).
const POLY1305_TAG_SIZE: usize = 16;

/// Label used for message key derivation (domain separation).
const MESSAGE_KEY_LABEL: &[u8] = b"matchwireMessageV1";

/// Symmetric codec for chat message bodies.
///
/// One cipher per signed-in session, keyed by a key derived from the
/// provisioned [`SessionSecret`]. The envelope text format is
/// `mw1.<base64 nonce>.<base64 ciphertext>` — self-describing enough for
/// [`MessageCipher::open`] to validate structure before touching the AEAD.
pub struct MessageCipher {
    key: [u8; 32],
}

impl MessageCipher {
    /// Derive the message key from the session secret.
    pub fn new(secret: &SessionSecret) -> Self {
        let hkdf = Hkdf::<Sha256>::new(None, secret.expose());

        let mut key = [0u8; 32];
        let Ok(()) = hkdf.expand(MESSAGE_KEY_LABEL, &mut key) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };

        Self { key }
    }

    /// Seal a plaintext into an envelope.
    ///
    /// The caller MUST provide cryptographically secure random nonce bytes
    /// in production; reusing a nonce under the same key breaks
    /// confidentiality.
    pub fn seal(&self, plaintext: &str, nonce: [u8; NONCE_SIZE]) -> String {
        let cipher = XChaCha20Poly1305::new((&self.key).into());

        let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
        else {
            unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
        };

        format!("{ENVELOPE_PREFIX}.{}.{}", STANDARD.encode(nonce), STANDARD.encode(ciphertext))
    }

    /// Open a sealed envelope back into its plaintext.
    ///
    /// # Errors
    ///
    /// - [`DecryptError::Malformed`] when the envelope structure is wrong
    /// - [`DecryptError::Authentication`] when the tag or key is wrong
    /// - [`DecryptError::InvalidPlaintext`] when the payload is not UTF-8
    pub fn open(&self, envelope: &str) -> Result<String, DecryptError> {
        let (nonce, ciphertext) = parse_envelope(envelope)?;

        let cipher = XChaCha20Poly1305::new((&self.key).into());
        let plaintext = cipher
            .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| DecryptError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| DecryptError::InvalidPlaintext)
    }
}

impl Drop for MessageCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for MessageCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MessageCipher(..)")
    }
}

/// Split and decode an envelope into (nonce, ciphertext).
fn parse_envelope(envelope: &str) -> Result<([u8; NONCE_SIZE], Vec<u8>), DecryptError> {
    let mut parts = envelope.splitn(3, '.');

    let prefix = parts.next().unwrap_or_default();
    if prefix != ENVELOPE_PREFIX {
        return Err(DecryptError::Malformed { reason: format!("unknown prefix {prefix:?}") });
    }

    let (Some(nonce_part), Some(ct_part)) = (parts.next(), parts.next()) else {
        return Err(DecryptError::Malformed { reason: "missing envelope sections".to_string() });
    };

    let nonce_bytes = STANDARD
        .decode(nonce_part)
        .map_err(|e| DecryptError::Malformed { reason: format!("nonce: {e}") })?;

    let nonce_len = nonce_bytes.len();
    let nonce: [u8; NONCE_SIZE] = nonce_bytes.try_into().map_err(|_| DecryptError::Malformed {
        reason: format!("nonce must be {NONCE_SIZE} bytes, got {nonce_len}"),
    })?;

    let ciphertext = STANDARD
        .decode(ct_part)
        .map_err(|e| DecryptError::Malformed { reason: format!("ciphertext: {e}") })?;

    if ciphertext.len() < POLY1305_TAG_SIZE {
        return Err(DecryptError::Malformed {
            reason: format!("ciphertext shorter than the {POLY1305_TAG_SIZE}-byte tag"),
        });
    }

    Ok((nonce, ciphertext))
}
