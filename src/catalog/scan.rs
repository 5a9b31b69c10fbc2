//! Cache-accelerated fingerprinting of whole trees

use super::{resolve_fingerprint, CatalogStore};
use crate::types::{CatalogEntry, FsakError};
use std::path::PathBuf;
use tracing::warn;

/// Events emitted while a tree is fingerprinted
#[derive(Debug)]
pub enum ScanEvent {
    /// A file's fingerprint is known
    Resolved {
        index: usize,
        path: PathBuf,
        cached: bool,
    },
    /// A file was skipped because of a per-file error
    Failed { path: PathBuf, error: String },
}

/// Callback used to receive scan events
pub type ScanCallback<'a> = dyn Fn(&ScanEvent) + Send + Sync + 'a;

/// Fingerprinted files of one scan
#[derive(Debug, Default)]
pub struct TreeScan {
    pub entries: Vec<CatalogEntry>,
    /// How many digests were reused from the catalog
    pub cached: usize,
    /// Paths skipped because of per-file errors
    pub failed: Vec<(PathBuf, String)>,
}

/// Fingerprint every path, reusing catalog digests where possible
///
/// Per-file failures are recorded and skipped; a store failure stops the
/// scan.
pub fn fingerprint_tree(
    paths: impl IntoIterator<Item = PathBuf>,
    store: &dyn CatalogStore,
    tag: &str,
    on_event: Option<&ScanCallback<'_>>,
) -> Result<TreeScan, FsakError> {
    let mut scan = TreeScan::default();

    for path in paths {
        match resolve_fingerprint(store, &path, tag) {
            Ok(resolved) => {
                if resolved.cached {
                    scan.cached += 1;
                }
                if let Some(callback) = on_event {
                    callback(&ScanEvent::Resolved {
                        index: scan.entries.len() + 1,
                        path: resolved.entry.path.clone(),
                        cached: resolved.cached,
                    });
                }
                scan.entries.push(resolved.entry);
            }
            Err(error) if error.is_per_file() => {
                warn!("Skipping {}: {}", path.display(), error);
                if let Some(callback) = on_event {
                    callback(&ScanEvent::Failed {
                        path: path.clone(),
                        error: error.to_string(),
                    });
                }
                scan.failed.push((path, error.to_string()));
            }
            Err(error) => return Err(error),
        }
    }

    Ok(scan)
}
