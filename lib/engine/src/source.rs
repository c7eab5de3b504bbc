//! Where the authoritative record table comes from.

use parking_lot::RwLock;
use schoolrec_core::{Result, SchoolRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A source of school records.
pub trait RecordSource: Send + Sync {
    fn load(&self) -> Result<Vec<SchoolRecord>>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

impl<T: RecordSource + ?Sized> RecordSource for Arc<T> {
    fn load(&self) -> Result<Vec<SchoolRecord>> {
        (**self).load()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// JSON file holding an array of flat school objects.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordSource for JsonFileSource {
    fn load(&self) -> Result<Vec<SchoolRecord>> {
        let data = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory record table that can be swapped out, standing in for an
/// external record store.
#[derive(Debug, Default)]
pub struct StaticSource {
    records: RwLock<Vec<SchoolRecord>>,
}

impl StaticSource {
    pub fn new(records: Vec<SchoolRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn replace(&self, records: Vec<SchoolRecord>) {
        *self.records.write() = records;
    }

    pub fn push(&self, record: SchoolRecord) {
        self.records.write().push(record);
    }
}

impl RecordSource for StaticSource {
    fn load(&self) -> Result<Vec<SchoolRecord>> {
        Ok(self.records.read().clone())
    }

    fn describe(&self) -> String {
        format!("in-memory table ({} records)", self.records.read().len())
    }
}
