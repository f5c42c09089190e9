//! Typed persistence for [`SwapRecord`]s.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::RecordError;
use crate::{Result, SwapRecord};

/// Storage capability for swap records, keyed by [`SwapRecord::swap_id`].
pub trait SwapStore: Send + Sync {
    /// Loads a record. `Ok(None)` if nothing is stored under `swap_id`.
    fn get(&self, swap_id: &str) -> Result<Option<SwapRecord>>;

    /// Inserts or replaces a record after validating it.
    fn put(&self, record: &SwapRecord) -> Result<()>;

    /// Removes a record, returning whether one existed.
    fn delete(&self, swap_id: &str) -> Result<bool>;
}

/// In-process store, mostly for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, SwapRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SwapStore for MemoryStore {
    fn get(&self, swap_id: &str) -> Result<Option<SwapRecord>> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(swap_id).cloned())
    }

    fn put(&self, record: &SwapRecord) -> Result<()> {
        record.validate()?;
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.swap_id.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, swap_id: &str) -> Result<bool> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.remove(swap_id).is_some())
    }
}

/// One pretty-printed JSON file per swap under `base_dir`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (and creates, if needed) the store directory.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, swap_id: &str) -> Result<PathBuf> {
        let valid = !swap_id.is_empty()
            && swap_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(RecordError::Malformed(format!(
                "swap id `{swap_id}` is not usable as a file name"
            ))
            .into());
        }
        Ok(self.base_dir.join(format!("{swap_id}.json")))
    }
}

impl SwapStore for JsonFileStore {
    fn get(&self, swap_id: &str) -> Result<Option<SwapRecord>> {
        let path = self.record_path(swap_id)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        SwapRecord::from_json(&json).map(Some)
    }

    fn put(&self, record: &SwapRecord) -> Result<()> {
        record.validate()?;
        let path = self.record_path(&record.swap_id)?;
        // Write then rename so a crash never leaves a half-written record.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, record.to_json()?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, swap_id: &str) -> Result<bool> {
        let path = self.record_path(swap_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
