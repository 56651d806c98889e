//! Matchwire Chat Session
//!
//! Orchestration layer binding the connection engine, the offline queue,
//! and the confidentiality codec into one chat session per signed-in
//! user.
//!
//! # Architecture
//!
//! [`ChatSession`] follows the same Sans-IO and action-based patterns as
//! [`matchwire_core`]: it consumes events and time, and produces
//! [`SessionAction`]s. The tokio [`SessionDriver`] executes those actions
//! against a [`Transport`] and exposes the async [`SessionHandle`] that
//! applications use.
//!
//! # Components
//!
//! - [`ChatSession`]: composition root for one user's chat
//! - [`CollaboratorApi`]: narrow async trait over the REST backend
//! - [`Transport`] / [`ChannelTransport`]: the event channel abstraction
//!   and its in-process implementation
//! - [`SessionDriver`] / [`SessionHandle`]: tokio event loop and its
//!   application-facing handle

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod driver;
mod error;
mod session;
mod transport;

pub use api::{ApiError, CollaboratorApi};
pub use driver::{SessionDriver, SessionHandle};
pub use error::SessionError;
pub use matchwire_core::{
    ConnectionConfig, ConnectionPhase, env::Environment, env::SystemEnv,
    storage::MemoryStore, storage::RedbStore,
};
pub use matchwire_crypto::SessionSecret;
pub use session::{ChatSession, SessionAction, StateCallback, UNDECRYPTABLE_PLACEHOLDER};
pub use transport::{ChannelTransport, Transport, TransportError, TransportHarness, TransportSignal};
