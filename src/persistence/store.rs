//! Host key/value stores for mapping records

use super::StoreError;
use crate::mapping::MappingRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Simple get/set store the pipeline exchanges [`MappingRecord`]s with.
pub trait MappingStore {
    fn get(&self, key: &str) -> Option<MappingRecord>;

    /// Inserts or replaces the record under `record.key`.
    fn set(&mut self, record: MappingRecord) -> Result<(), StoreError>;

    fn all(&self) -> Vec<MappingRecord>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, MappingRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MappingStore for MemoryStore {
    fn get(&self, key: &str) -> Option<MappingRecord> {
        self.records.get(key).cloned()
    }

    fn set(&mut self, record: MappingRecord) -> Result<(), StoreError> {
        self.records.insert(record.key.clone(), record);
        Ok(())
    }

    fn all(&self) -> Vec<MappingRecord> {
        self.records.values().cloned().collect()
    }
}

// On-disk shape: a `[[mapping]]` array of tables
#[derive(Deserialize, Serialize, Default, Debug)]
struct MappingFile {
    #[serde(default)]
    mapping: Vec<MappingRecord>,
}

/// Records kept in one TOML file, rewritten on every `set`.
#[derive(Debug)]
pub struct TomlStore {
    path: PathBuf,
    records: BTreeMap<String, MappingRecord>,
}

impl TomlStore {
    /// Opens the file at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let file: MappingFile = toml::from_str(&content)?;
                file.mapping
                    .into_iter()
                    .map(|record| (record.key.clone(), record))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No mapping file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        info!("Opened mapping store {} ({} records)", path.display(), records.len());
        Ok(Self { path, records })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let file = MappingFile {
            mapping: self.records.values().cloned().collect(),
        };
        let content = toml::to_string_pretty(&file)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl MappingStore for TomlStore {
    fn get(&self, key: &str) -> Option<MappingRecord> {
        self.records.get(key).cloned()
    }

    fn set(&mut self, record: MappingRecord) -> Result<(), StoreError> {
        self.records.insert(record.key.clone(), record);
        self.flush()
    }

    fn all(&self) -> Vec<MappingRecord> {
        self.records.values().cloned().collect()
    }
}
