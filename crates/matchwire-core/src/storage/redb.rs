//! Redb-backed durable store.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. The
//! queue survives app restarts and process kills mid-write.

use std::{path::Path, sync::Arc};

use redb::{Database, TableDefinition};

use super::{QueueStore, StoreError};
use crate::queue::OfflineMessage;

/// Table: outbox
/// Key: the single queue slot ("queue")
/// Value: CBOR-encoded `Vec<OfflineMessage>`
const OUTBOX: TableDefinition<&str, &[u8]> = TableDefinition::new("outbox");

/// Key under which the serialized queue lives.
const QUEUE_KEY: &str = "queue";

/// Durable queue store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(|e| StoreError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(OUTBOX).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl QueueStore for RedbStore {
    fn save(&self, entries: &[OfflineMessage]) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(&entries, &mut bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let mut table = txn.open_table(OUTBOX).map_err(|e| StoreError::Io(e.to_string()))?;
            table
                .insert(QUEUE_KEY, bytes.as_slice())
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }

    fn load(&self) -> Result<Vec<OfflineMessage>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(OUTBOX).map_err(|e| StoreError::Io(e.to_string()))?;

        let Some(value) = table.get(QUEUE_KEY).map_err(|e| StoreError::Io(e.to_string()))?
        else {
            return Ok(Vec::new());
        };

        ciborium::from_reader(value.value()).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let mut table = txn.open_table(OUTBOX).map_err(|e| StoreError::Io(e.to_string()))?;
            table.remove(QUEUE_KEY).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use matchwire_proto::{MessageKind, OutboundMessage};

    use super::*;

    fn entry(id: u64, content: &str) -> OfflineMessage {
        OfflineMessage {
            id,
            match_id: "m1".into(),
            message: OutboundMessage {
                match_id: "m1".into(),
                content: content.into(),
                kind: MessageKind::Text,
            },
        }
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("outbox.redb")).unwrap();

        let entries = vec![entry(1, "a"), entry(2, "b")];
        store.save(&entries).unwrap();

        assert_eq!(store.load().unwrap(), entries);
    }

    #[test]
    fn load_from_fresh_database_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("outbox.redb")).unwrap();

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_replaces_the_previous_queue() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("outbox.redb")).unwrap();

        store.save(&[entry(1, "a"), entry(2, "b")]).unwrap();
        store.save(&[entry(3, "c")]).unwrap();

        assert_eq!(store.load().unwrap(), vec![entry(3, "c")]);
    }

    #[test]
    fn clear_then_load_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("outbox.redb")).unwrap();

        store.save(&[entry(1, "a")]).unwrap();
        store.clear().unwrap();

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn queue_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            store.save(&[entry(1, "a"), entry(2, "b")]).unwrap();
        }

        let reopened = RedbStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), vec![entry(1, "a"), entry(2, "b")]);
    }

    #[test]
    fn clear_on_empty_store_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("outbox.redb")).unwrap();

        store.clear().unwrap();
    }
}
