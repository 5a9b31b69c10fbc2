//! Catalog store: durable mapping from path-derived key to entry
//!
//! The store contract is deliberately small. Adapters serialize their own
//! access, but every long-running operation still funnels writes through a
//! single owner (see `pipeline`), so no adapter needs multi-writer support.

mod memory;
mod scan;
mod sqlite;

pub use memory::MemoryCatalog;
pub use scan::{fingerprint_tree, ScanCallback, ScanEvent, TreeScan};
pub use sqlite::SqliteCatalog;

use crate::types::{CatalogEntry, FsakError};
use std::fs;
use std::path::Path;
use tracing::trace;

/// Storage boundary for catalog entries
pub trait CatalogStore: Send + Sync {
    /// Look up the entry for an absolute path. A miss is `Ok(None)`.
    fn get(&self, path: &Path) -> Result<Option<CatalogEntry>, FsakError>;

    /// Insert, or overwrite every field of the row with the same key while
    /// keeping the row's identity.
    fn upsert(&self, entry: &CatalogEntry) -> Result<(), FsakError>;

    /// Upsert a batch as one unit. Either every entry lands or none does.
    fn upsert_batch(&self, entries: &[CatalogEntry]) -> Result<(), FsakError> {
        for entry in entries {
            self.upsert(entry)?;
        }
        Ok(())
    }

    /// Remove a row by key. Returns whether a row existed.
    fn delete(&self, key: &str) -> Result<bool, FsakError>;

    /// Every entry in a stable order
    fn all(&self) -> Result<Vec<CatalogEntry>, FsakError>;

    /// Number of rows
    fn count(&self) -> Result<usize, FsakError> {
        Ok(self.all()?.len())
    }
}

/// A fingerprinted file, and whether the digests came from the catalog
#[derive(Debug, Clone)]
pub struct Resolved {
    pub entry: CatalogEntry,
    pub cached: bool,
}

/// Fingerprint a file, reusing the catalog's digests when the path is known
///
/// On a miss the file is read once, and the fresh entry is upserted so the
/// next scan can reuse it.
pub fn resolve_fingerprint(
    store: &dyn CatalogStore,
    path: &Path,
    tag: &str,
) -> Result<Resolved, FsakError> {
    let absolute = fs::canonicalize(path).map_err(|e| FsakError::path_io(path, e))?;

    if let Some(entry) = store.get(&absolute)? {
        if entry.fingerprint.is_complete() {
            trace!("catalog hit for {}", absolute.display());
            return Ok(Resolved {
                entry,
                cached: true,
            });
        }
    }

    let entry = CatalogEntry::from_path(&absolute, tag)?;
    store.upsert(&entry)?;
    trace!("catalog miss for {}, stored fresh fingerprint", absolute.display());
    Ok(Resolved {
        entry,
        cached: false,
    })
}
