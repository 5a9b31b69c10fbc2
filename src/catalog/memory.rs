//! In-memory catalog for headless runs and tests

use super::CatalogStore;
use crate::hash::path_key;
use crate::types::{CatalogEntry, FsakError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Catalog kept in a map keyed by entry key; `all()` is ordered by key.
#[derive(Default)]
pub struct MemoryCatalog {
    rows: Mutex<BTreeMap<String, CatalogEntry>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<MutexGuard<'_, BTreeMap<String, CatalogEntry>>, FsakError> {
        self.rows
            .lock()
            .map_err(|_| FsakError::Store("memory catalog lock poisoned".to_string()))
    }
}

impl CatalogStore for MemoryCatalog {
    fn get(&self, path: &Path) -> Result<Option<CatalogEntry>, FsakError> {
        Ok(self.rows()?.get(&path_key(path)).cloned())
    }

    fn upsert(&self, entry: &CatalogEntry) -> Result<(), FsakError> {
        self.rows()?.insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    fn upsert_batch(&self, entries: &[CatalogEntry]) -> Result<(), FsakError> {
        let mut rows = self.rows()?;
        for entry in entries {
            rows.insert(entry.key.clone(), entry.clone());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, FsakError> {
        Ok(self.rows()?.remove(key).is_some())
    }

    fn all(&self) -> Result<Vec<CatalogEntry>, FsakError> {
        Ok(self.rows()?.values().cloned().collect())
    }

    fn count(&self) -> Result<usize, FsakError> {
        Ok(self.rows()?.len())
    }
}
