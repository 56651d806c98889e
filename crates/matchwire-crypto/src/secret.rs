//! Session secret provisioning.

use base64::{Engine, engine::general_purpose::STANDARD};
use zeroize::Zeroize;

use crate::error::SecretError;

/// Size of the session secret in bytes.
pub const SECRET_SIZE: usize = 32;

/// Session-scoped secret for message confidentiality.
///
/// Provisioned by the application at session setup, typically delivered
/// alongside the auth token. There is no `Default` implementation and no
/// built-in fallback value; a deployment that cannot provision a secret
/// cannot construct one. Material is zeroized on drop.
#[derive(Clone)]
pub struct SessionSecret([u8; SECRET_SIZE]);

impl Drop for SessionSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl SessionSecret {
    /// Wrap raw secret material.
    pub fn from_bytes(bytes: [u8; SECRET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decode secret material from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        let decoded = STANDARD
            .decode(encoded)
            .map_err(|e| SecretError::InvalidEncoding { reason: e.to_string() })?;

        let len = decoded.len();
        let bytes: [u8; SECRET_SIZE] = decoded
            .try_into()
            .map_err(|_| SecretError::InvalidLength { expected: SECRET_SIZE, got: len })?;

        Ok(Self(bytes))
    }

    /// Raw secret material, for key derivation only.
    pub(crate) fn expose(&self) -> &[u8; SECRET_SIZE] {
        &self.0
    }
}

// Debug must not leak key material.
impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionSecret(..)")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_base64_round_trip() {
        let bytes = [0x42u8; SECRET_SIZE];
        let encoded = STANDARD.encode(bytes);

        let secret = SessionSecret::from_base64(&encoded).unwrap();
        assert_eq!(secret.expose(), &bytes);
    }

    #[test]
    fn from_base64_rejects_wrong_length() {
        let encoded = STANDARD.encode([0u8; 16]);
        let result = SessionSecret::from_base64(&encoded);

        assert!(matches!(result, Err(SecretError::InvalidLength { expected: 32, got: 16 })));
    }

    #[test]
    fn from_base64_rejects_garbage() {
        let result = SessionSecret::from_base64("not base64 at all!");
        assert!(matches!(result, Err(SecretError::InvalidEncoding { .. })));
    }

    #[test]
    fn debug_does_not_leak_material() {
        let secret = SessionSecret::from_bytes([0xAA; SECRET_SIZE]);
        let rendered = format!("{secret:?}");

        assert_eq!(rendered, "SessionSecret(..)");
    }
}
