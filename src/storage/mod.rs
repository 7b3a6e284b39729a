//! Case history storage
//!
//! Saved cases live behind the narrow [`CaseStore`] interface:
//! - append a snapshot
//! - list snapshots, newest first
//! - delete one by id
//! - clear everything
//!
//! The engine never touches a store; callers evaluate first, then save.

pub mod export;
mod persistence;
pub mod record;

pub use persistence::FileStore;
pub use record::{CaseRecord, Stamper, SystemStamper};

use std::sync::{Arc, RwLock};
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store lock poisoned")]
    LockPoisoned,
}

pub trait CaseStore: Send + Sync {
    /// Adds a record at the head of the history, trimming the oldest beyond
    /// the store's limit.
    fn append(&self, record: CaseRecord) -> Result<(), StorageError>;

    /// All records, newest first.
    fn list(&self) -> Result<Vec<CaseRecord>, StorageError>;

    /// Returns whether a record with `id` existed.
    fn delete(&self, id: &str) -> Result<bool, StorageError>;

    fn clear(&self) -> Result<(), StorageError>;
}

/// Push `record` to the front and cap the history at `limit`.
fn push_newest(records: &mut Vec<CaseRecord>, record: CaseRecord, limit: usize) {
    records.insert(0, record);
    records.truncate(limit);
}

#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<Vec<CaseRecord>>,
    history_limit: usize,
}

impl MemoryStore {
    pub fn new(history_limit: usize) -> Self {
        MemoryStore {
            records: RwLock::new(Vec::new()),
            history_limit,
        }
    }
}

impl CaseStore for MemoryStore {
    fn append(&self, record: CaseRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        push_newest(&mut records, record, self.history_limit);
        Ok(())
    }

    fn list(&self) -> Result<Vec<CaseRecord>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.clone())
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        records.clear();
        Ok(())
    }
}

/// Build the store selected by configuration.
pub fn open(config: &StorageConfig) -> Result<Arc<dyn CaseStore>, StorageError> {
    match config.backend {
        StorageBackend::Memory => {
            info!(history_limit = config.history_limit, "using in-memory case store");
            Ok(Arc::new(MemoryStore::new(config.history_limit)))
        }
        StorageBackend::File => {
            let store = FileStore::open(&config.path, config.history_limit)?;
            info!(path = %config.path, history_limit = config.history_limit, "using file case store");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::CaseInput;
    use crate::engine::evaluate;
    use crate::storage::record::tests::FixedStamper;

    pub(crate) fn record(id: &'static str) -> CaseRecord {
        let input = CaseInput::default();
        CaseRecord::build(&input, &evaluate(&input), &FixedStamper::new(id))
    }

    fn ids(store: &dyn CaseStore) -> Vec<String> {
        store.list().unwrap().into_iter().map(|r| r.id).collect()
    }

    #[test]
    fn newest_first_and_capped() {
        let store = MemoryStore::new(2);
        store.append(record("a")).unwrap();
        store.append(record("b")).unwrap();
        store.append(record("c")).unwrap();

        assert_eq!(ids(&store), vec!["c", "b"]);
    }

    #[test]
    fn delete_and_clear() {
        let store = MemoryStore::new(200);
        store.append(record("a")).unwrap();
        store.append(record("b")).unwrap();

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert_eq!(ids(&store), vec!["b"]);

        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}
