//! Matchwire Cryptographic Primitives
//!
//! Message confidentiality for the chat transport. Pure functions with
//! deterministic outputs; callers provide random bytes so tests stay
//! deterministic.
//!
//! # Key Lifecycle
//!
//! The application provisions one [`SessionSecret`] per signed-in session.
//! There is deliberately no default and no fallback constant: key
//! provisioning is a required external input, not something this crate
//! invents.
//!
//! ```text
//! Session Secret (provisioned)
//!        │
//!        ▼
//! HKDF-SHA256 → Message Key (per session)
//!        │
//!        ▼
//! XChaCha20-Poly1305 → Sealed Envelope ("mw1.<nonce>.<ciphertext>")
//! ```
//!
//! # Security
//!
//! - Every seal uses a fresh caller-supplied 24-byte random nonce, so
//!   sealing the same plaintext twice yields different envelopes.
//! - Poly1305 authentication rejects tampered or wrong-key envelopes.
//! - The envelope format is self-describing: [`MessageCipher::open`]
//!   distinguishes a malformed envelope from an authentication failure.
//! - HMAC verification is constant-time.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod digest;
mod envelope;
mod error;
mod secret;

pub use digest::{hmac_sha256_hex, sha256_hex, verify_hmac_sha256};
pub use envelope::{ENVELOPE_PREFIX, MessageCipher, NONCE_SIZE};
pub use error::{DecryptError, SecretError};
pub use secret::SessionSecret;
