//! Layout persistence
//!
//! Stores are opaque key-value maps from document URI to [`LayoutRecord`].
//! Nothing here runs on the interactive path; records are written on
//! `saveModel` and read when a document is opened.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tandem_identity::document_seed;
use tandem_model::LayoutRecord;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt layout record {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode layout record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Layout store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait LayoutStore: Send + Sync {
    fn load(&self, file_uri: &str) -> StoreResult<Option<LayoutRecord>>;

    fn save(&self, record: &LayoutRecord) -> StoreResult<()>;

    fn remove(&self, file_uri: &str) -> StoreResult<bool>;
}

#[derive(Debug, Default)]
pub struct MemoryLayoutStore {
    records: Mutex<HashMap<String, LayoutRecord>>,
}

impl MemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn load(&self, file_uri: &str) -> StoreResult<Option<LayoutRecord>> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(file_uri).cloned())
    }

    fn save(&self, record: &LayoutRecord) -> StoreResult<()> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        records.insert(record.file_uri.clone(), record.clone());
        Ok(())
    }

    fn remove(&self, file_uri: &str) -> StoreResult<bool> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.remove(file_uri).is_some())
    }
}

/// One `<seed>.layout.json` file per document in `dir`
#[derive(Debug, Clone)]
pub struct JsonFileLayoutStore {
    dir: PathBuf,
}

impl JsonFileLayoutStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file_uri: &str) -> PathBuf {
        self.dir.join(format!("{}.layout.json", document_seed(file_uri)))
    }
}

impl LayoutStore for JsonFileLayoutStore {
    fn load(&self, file_uri: &str) -> StoreResult<Option<LayoutRecord>> {
        let path = self.path_for(file_uri);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: LayoutRecord =
            serde_json::from_str(&text).map_err(|source| StoreError::Corrupt { path, source })?;
        if record.file_uri != file_uri {
            tracing::warn!(expected = file_uri, found = %record.file_uri, "layout record belongs to another document");
            return Ok(None);
        }
        Ok(Some(record))
    }

    fn save(&self, record: &LayoutRecord) -> StoreResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&record.file_uri);
        let json = serde_json::to_string_pretty(record).map_err(StoreError::Encode)?;

        // Write then rename so readers never see a partial record
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!(path = %path.display(), "saved layout record");
        Ok(())
    }

    fn remove(&self, file_uri: &str) -> StoreResult<bool> {
        match std::fs::remove_file(self.path_for(file_uri)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
