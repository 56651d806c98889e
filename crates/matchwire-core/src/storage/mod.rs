//! Durable storage for the outbound queue.
//!
//! Trait-based abstraction so the engine does not care where the queue
//! lives. The trait is synchronous: one small serialized blob per device,
//! single writer, no reason for async.

mod error;
mod memory;
mod redb;

pub use error::StoreError;
pub use memory::MemoryStore;

pub use self::redb::RedbStore;
use crate::queue::OfflineMessage;

/// Storage abstraction for the serialized outbound queue.
///
/// Must be `Clone` (shared with test assertions), `Send + Sync`, and
/// synchronous. Implementations typically share internal state via `Arc`,
/// so clones access the same underlying storage.
pub trait QueueStore: Clone + Send + Sync + 'static {
    /// Persist the full queue, replacing any previous copy.
    fn save(&self, entries: &[OfflineMessage]) -> Result<(), StoreError>;

    /// Load the persisted queue. Empty when nothing was persisted.
    fn load(&self) -> Result<Vec<OfflineMessage>, StoreError>;

    /// Remove the persisted copy.
    fn clear(&self) -> Result<(), StoreError>;
}
