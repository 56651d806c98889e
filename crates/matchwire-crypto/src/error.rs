//! Error types for the confidentiality codec.

use thiserror::Error;

/// Errors opening a sealed message envelope.
///
/// Callers (the session layer) always catch this: one undecryptable
/// message must not abort the surrounding batch or stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    /// The envelope does not have the expected structure.
    #[error("malformed envelope: {reason}")]
    Malformed {
        /// What was wrong with the structure.
        reason: String,
    },

    /// The Poly1305 tag did not verify: tampered ciphertext or key
    /// mismatch.
    #[error("envelope authentication failed")]
    Authentication,

    /// The envelope authenticated but the plaintext was not valid UTF-8.
    #[error("decrypted payload is not valid UTF-8")]
    InvalidPlaintext,
}

/// Errors constructing a [`crate::SessionSecret`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    /// The provided material was not the required length.
    #[error("session secret must be {expected} bytes, got {got}")]
    InvalidLength {
        /// Required secret size.
        expected: usize,
        /// Size of the provided material.
        got: usize,
    },

    /// The provided material was not valid base64.
    #[error("session secret is not valid base64: {reason}")]
    InvalidEncoding {
        /// Decoder failure description.
        reason: String,
    },
}
