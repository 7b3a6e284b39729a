use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{push_newest, CaseRecord, CaseStore, StorageError};

const HISTORY_FILE: &str = "case_history.json";

/// Case history kept as one JSON array on disk.
///
/// The full history is cached in memory; every change rewrites the file
/// through a temp file and rename.
#[derive(Debug)]
pub struct FileStore {
    history_path: PathBuf,
    records: Mutex<Vec<CaseRecord>>,
    history_limit: usize,
}

impl FileStore {
    pub fn open(base_path: impl AsRef<Path>, history_limit: usize) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref();
        fs::create_dir_all(base_path)?;

        let history_path = base_path.join(HISTORY_FILE);
        let mut records = load_history(&history_path)?;
        if records.len() > history_limit {
            warn!(
                stored = records.len(),
                history_limit, "stored history exceeds limit, dropping oldest records"
            );
            records.truncate(history_limit);
        }

        Ok(FileStore {
            history_path,
            records: Mutex::new(records),
            history_limit,
        })
    }

    /// Write the history to disk atomically.
    fn save(&self, records: &[CaseRecord]) -> Result<(), StorageError> {
        let serialized = serde_json::to_vec_pretty(records)?;

        // Write to a temporary file first
        let temp_path = self.history_path.with_extension("tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| StorageError::PersistenceError(format!("Failed to create file: {}", e)))?;

        file.write_all(&serialized)
            .map_err(|e| StorageError::PersistenceError(format!("Failed to write data: {}", e)))?;

        file.sync_all()
            .map_err(|e| StorageError::PersistenceError(format!("Failed to sync data: {}", e)))?;

        fs::rename(&temp_path, &self.history_path)
            .map_err(|e| StorageError::PersistenceError(format!("Failed to rename file: {}", e)))?;

        debug!(path = %self.history_path.display(), records = records.len(), "case history saved");
        Ok(())
    }
}

fn load_history(path: &Path) -> Result<Vec<CaseRecord>, StorageError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StorageError::PersistenceError(format!(
                "Failed to open history file: {}",
                e
            )))
        }
    };

    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)
        .map_err(|e| StorageError::PersistenceError(format!("Failed to read history file: {}", e)))?;

    if buffer.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&buffer)?)
}

impl CaseStore for FileStore {
    fn append(&self, record: CaseRecord) -> Result<(), StorageError> {
        let mut records = self.records.lock().map_err(|_| StorageError::LockPoisoned)?;
        let mut next = records.clone();
        push_newest(&mut next, record, self.history_limit);
        self.save(&next)?;
        *records = next;
        Ok(())
    }

    fn list(&self) -> Result<Vec<CaseRecord>, StorageError> {
        let records = self.records.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.clone())
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut records = self.records.lock().map_err(|_| StorageError::LockPoisoned)?;
        if !records.iter().any(|r| r.id == id) {
            return Ok(false);
        }
        let next: Vec<CaseRecord> = records.iter().filter(|r| r.id != id).cloned().collect();
        self.save(&next)?;
        *records = next;
        Ok(true)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut records = self.records.lock().map_err(|_| StorageError::LockPoisoned)?;
        self.save(&[])?;
        records.clear();
        Ok(())
    }
}
