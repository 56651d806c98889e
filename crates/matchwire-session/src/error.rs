//! Session error types.
//!
//! Only two things reach a caller synchronously: misuse (emitting before
//! any connect) and the first connection attempt's failure. Everything
//! else is recovered internally and surfaced through state-change
//! notifications.

use matchwire_core::ConnectionError;
use thiserror::Error;

use crate::api::ApiError;

/// Errors surfaced by the session layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Caller misuse reported by the connection state machine.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A collaborator REST call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The caller-initiated first connection attempt failed.
    #[error("connect failed: {reason}")]
    ConnectFailed {
        /// Transport-level failure description.
        reason: String,
    },

    /// The gateway rejected the auth token; refresh credentials and
    /// reconnect.
    #[error("authentication rejected: {message}")]
    AuthRejected {
        /// Gateway error message.
        message: String,
    },

    /// A `connect()` call raced another connect still in flight.
    #[error("connect already in progress")]
    ConnectInProgress,

    /// The driver task is gone; the session cannot be reached.
    #[error("session driver is no longer running")]
    DriverClosed,
}
