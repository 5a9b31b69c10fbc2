//! Catalog cleaning and the dirty-file sweep

mod dirty;

pub use dirty::{find_dirty, move_dirty, DirtyCategory, DirtyItem, DirtySummary};

use crate::catalog::CatalogStore;
use crate::types::FsakError;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Totals for a cleaning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub checked: usize,
    pub removed: usize,
    /// Rows kept because existence could not be determined
    pub undetermined: usize,
}

/// Events emitted while cleaning
#[derive(Debug)]
pub enum CleanEvent {
    Checked { index: usize, total: usize },
    Removed { path: PathBuf },
}

/// Callback used to receive cleaning events
pub type CleanCallback<'a> = dyn Fn(&CleanEvent) + Send + Sync + 'a;

/// Delete catalog rows whose file is gone from disk
///
/// Only a definite "not found" removes a row; any other stat failure
/// (permissions, unmounted volume) keeps it.
pub fn clean_catalog(
    store: &dyn CatalogStore,
    on_event: Option<&CleanCallback<'_>>,
) -> Result<CleanSummary, FsakError> {
    let entries = store.all()?;
    let total = entries.len();
    let mut summary = CleanSummary::default();
    info!("Checking {} catalog entries", total);

    for (i, entry) in entries.iter().enumerate() {
        summary.checked += 1;
        match fs::symlink_metadata(&entry.path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if store.delete(&entry.key)? {
                    summary.removed += 1;
                    debug!("Removed stale row for {}", entry.path.display());
                    if let Some(callback) = on_event {
                        callback(&CleanEvent::Removed {
                            path: entry.path.clone(),
                        });
                    }
                }
            }
            Err(e) => {
                summary.undetermined += 1;
                warn!("Keeping row for {}: {}", entry.path.display(), e);
            }
        }
        if let Some(callback) = on_event {
            callback(&CleanEvent::Checked {
                index: i + 1,
                total,
            });
        }
    }

    info!(
        "Checked {} entries, removed {}",
        summary.checked, summary.removed
    );
    Ok(summary)
}
