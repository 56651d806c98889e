//! Matchwire Connection & Delivery Engine
//!
//! The resilient half of the chat client: connection lifecycle, heartbeat
//! liveness, reconnection with backoff, the durable offline outbound
//! queue, and the listener registry.
//!
//! # Architecture
//!
//! Everything stateful here is a Sans-IO state machine in the action
//! pattern: events and time go in, [`ConnectionAction`]s come out, and a
//! driver executes them. No module in this crate performs network I/O or
//! reads the clock; the [`env::Environment`] abstraction supplies time and
//! randomness, which is what makes every reconnect/heartbeat/backoff path
//! deterministically testable.
//!
//! # Components
//!
//! - [`Connection`]: transport lifecycle state machine
//! - [`OfflineQueue`]: durable FIFO of outbound messages
//! - [`storage::QueueStore`]: where the queue persists ([`storage::MemoryStore`],
//!   [`storage::RedbStore`])
//! - [`EventDispatcher`]: subscription-handle listener registry

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod connection;
mod dispatcher;
pub mod env;
mod error;
mod queue;
pub mod storage;

pub use connection::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionPhase, Credentials,
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_INITIAL_RETRY_DELAY,
    DEFAULT_LONG_RETRY_DELAY, DEFAULT_SHORT_RETRY_LIMIT,
};
pub use dispatcher::{EventCallback, EventDispatcher, SubscriptionId};
pub use env::{Environment, SystemEnv};
pub use error::ConnectionError;
pub use queue::{OfflineMessage, OfflineQueue};
