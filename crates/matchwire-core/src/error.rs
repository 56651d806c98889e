//! Error types for the connection engine.
//!
//! Steady-state failures (drops, timeouts, retry exhaustion) are never
//! errors here — they are recovered internally and surfaced as phase
//! change actions. The only synchronous error is caller misuse.

use thiserror::Error;

use crate::connection::ConnectionPhase;

/// Errors that can occur during connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Operation attempted in a state that cannot service it, e.g.
    /// emitting an event before any `connect()` call.
    #[error("invalid state: cannot {operation} from {phase:?}")]
    InvalidState {
        /// Current phase when the error occurred.
        phase: ConnectionPhase,
        /// Operation that was attempted.
        operation: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_names_the_operation() {
        let err =
            ConnectionError::InvalidState { phase: ConnectionPhase::Disconnected, operation: "emit" };

        let rendered = err.to_string();
        assert!(rendered.contains("emit"));
        assert!(rendered.contains("Disconnected"));
    }
}
