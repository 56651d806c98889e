//! In-memory store for tests and simulation.

use std::sync::{Arc, Mutex};

use super::{QueueStore, StoreError};
use crate::queue::OfflineMessage;

/// In-memory queue store.
///
/// Serializes through the same CBOR path as the durable backend so tests
/// exercise the full round-trip. Clones share the same underlying blob.
/// A `failing()` variant rejects every operation, for exercising the
/// best-effort persistence policy.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    blob: Arc<Mutex<Option<Vec<u8>>>>,
    fail: bool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self { blob: Arc::new(Mutex::new(None)), fail: false }
    }

    /// Create a store whose every operation fails with an I/O error.
    pub fn failing() -> Self {
        Self { blob: Arc::new(Mutex::new(None)), fail: true }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueStore for MemoryStore {
    fn save(&self, entries: &[OfflineMessage]) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Io("injected failure".to_string()));
        }

        let mut bytes = Vec::new();
        ciborium::into_writer(&entries, &mut bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut blob =
            self.blob.lock().map_err(|_| StoreError::Io("poisoned lock".to_string()))?;
        *blob = Some(bytes);

        Ok(())
    }

    fn load(&self) -> Result<Vec<OfflineMessage>, StoreError> {
        if self.fail {
            return Err(StoreError::Io("injected failure".to_string()));
        }

        let blob = self.blob.lock().map_err(|_| StoreError::Io("poisoned lock".to_string()))?;

        match blob.as_deref() {
            None => Ok(Vec::new()),
            Some(bytes) => ciborium::from_reader(bytes)
                .map_err(|e| StoreError::Serialization(e.to_string())),
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Io("injected failure".to_string()));
        }

        let mut blob =
            self.blob.lock().map_err(|_| StoreError::Io("poisoned lock".to_string()))?;
        *blob = None;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use matchwire_proto::{MessageKind, OutboundMessage};

    use super::*;

    fn entry(id: u64) -> OfflineMessage {
        OfflineMessage {
            id,
            match_id: "m1".into(),
            message: OutboundMessage {
                match_id: "m1".into(),
                content: "sealed".into(),
                kind: MessageKind::Text,
            },
        }
    }

    #[test]
    fn save_load_round_trip() {
        let store = MemoryStore::new();
        let entries = vec![entry(1), entry(2)];

        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), entries);
    }

    #[test]
    fn load_without_save_is_empty() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn clear_removes_the_blob() {
        let store = MemoryStore::new();
        store.save(&[entry(1)]).unwrap();

        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();

        store.save(&[entry(7)]).unwrap();
        assert_eq!(clone.load().unwrap(), vec![entry(7)]);
    }

    #[test]
    fn failing_store_rejects_everything() {
        let store = MemoryStore::failing();

        assert!(store.save(&[entry(1)]).is_err());
        assert!(store.load().is_err());
        assert!(store.clear().is_err());
    }
}
