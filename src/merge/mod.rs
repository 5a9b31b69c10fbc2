//! Merge engine: bring content that is missing from a target tree over
//! from a source tree, into a dated backup folder inside the target.

use crate::catalog::{fingerprint_tree, CatalogStore, ScanCallback};
use crate::executor::{copy_file_atomic, free_destination};
use crate::scanner::{canonical_roots, ExclusionRules, TreeWalker};
use crate::types::{CatalogEntry, Fingerprint, FsakError};
use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tag stamped on catalog entries created for copied files
pub const MERGE_TAG: &str = "merge";

/// `FSAK_240131`
pub fn backup_dir_name(date: NaiveDate) -> String {
    format!("FSAK_{}", date.format("%y%m%d"))
}

/// What a merge will copy
#[derive(Debug)]
pub struct MergePlan {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Destination folder for novel files, inside `target`
    pub backup_dir: PathBuf,
    /// Source files whose content is nowhere under target, in walk order
    pub novel: Vec<CatalogEntry>,
    pub source_files: usize,
    pub target_files: usize,
    /// Files that could not be fingerprinted
    pub skipped: usize,
}

/// Totals for an executed merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub copied: usize,
    pub bytes: u64,
}

/// Events emitted while copying
#[derive(Debug)]
pub enum MergeEvent {
    Copied {
        index: usize,
        total: usize,
        from: PathBuf,
        to: PathBuf,
        bytes: u64,
    },
    Complete {
        summary: MergeSummary,
    },
}

/// Callback used to receive merge events
pub type MergeCallback<'a> = dyn Fn(&MergeEvent) + Send + Sync + 'a;

/// Fingerprint both trees and decide which source files are novel
///
/// Paths under `skip` (the catalog database) are never scanned. The backup
/// folder is named after today's local date.
///
/// # Errors
/// * `FsakError::Config` if either side is missing, not a directory, or
///   both name the same directory
pub fn plan_merge(
    source: &Path,
    target: &Path,
    store: &dyn CatalogStore,
    skip: &[PathBuf],
    on_event: Option<&ScanCallback<'_>>,
) -> Result<MergePlan, FsakError> {
    let (source, target) = validate_pair(source, target)?;
    let backup_dir = target.join(backup_dir_name(Local::now().date_naive()));

    info!("Scanning merge target {}", target.display());
    let target_scan = fingerprint_tree(walker_for(&target, skip), store, "", on_event)?;
    info!("Scanning merge source {}", source.display());
    let source_scan = fingerprint_tree(walker_for(&source, skip), store, "", on_event)?;

    let present: HashSet<&Fingerprint> = target_scan
        .entries
        .iter()
        .map(|entry| &entry.fingerprint)
        .collect();
    let source_files = source_scan.entries.len();
    let novel: Vec<CatalogEntry> = source_scan
        .entries
        .into_iter()
        .filter(|entry| !present.contains(&entry.fingerprint))
        .collect();

    info!(
        "{} of {} source files are not present in target",
        novel.len(),
        source_files
    );

    Ok(MergePlan {
        backup_dir,
        novel,
        source_files,
        target_files: target_scan.entries.len(),
        skipped: source_scan.failed.len() + target_scan.failed.len(),
        source,
        target,
    })
}

/// Copy every novel file into the backup folder
///
/// Each copy is flushed to disk before the destination is fingerprinted and
/// upserted. The first failure stops the merge; files already copied stay
/// copied and catalogued.
pub fn execute_merge(
    plan: &MergePlan,
    store: &dyn CatalogStore,
    on_event: Option<&MergeCallback<'_>>,
) -> Result<MergeSummary, FsakError> {
    let mut summary = MergeSummary::default();
    let total = plan.novel.len();

    for (i, entry) in plan.novel.iter().enumerate() {
        let relative = entry
            .path
            .strip_prefix(&plan.source)
            .unwrap_or(Path::new(&entry.name));
        let dest = free_destination(&plan.backup_dir.join(relative));

        let bytes = copy_file_atomic(&entry.path, &dest)?;
        let copied = CatalogEntry::from_path(&dest, MERGE_TAG)?;
        store.upsert(&copied)?;
        debug!("Copied {} to {}", entry.path.display(), dest.display());

        summary.copied += 1;
        summary.bytes += bytes;
        if let Some(callback) = on_event {
            callback(&MergeEvent::Copied {
                index: i + 1,
                total,
                from: entry.path.clone(),
                to: copied.path,
                bytes,
            });
        }
    }

    if let Some(callback) = on_event {
        callback(&MergeEvent::Complete {
            summary: summary.clone(),
        });
    }
    info!("Merge copied {} files ({} bytes)", summary.copied, summary.bytes);
    Ok(summary)
}

fn validate_pair(source: &Path, target: &Path) -> Result<(PathBuf, PathBuf), FsakError> {
    let source = single_root(source)?;
    let target = single_root(target)?;
    if source == target {
        return Err(FsakError::Config(format!(
            "Source and target are the same directory: {}",
            source.display()
        )));
    }
    Ok((source, target))
}

fn single_root(dir: &Path) -> Result<PathBuf, FsakError> {
    canonical_roots(&[dir.to_path_buf()])?
        .pop()
        .ok_or_else(|| FsakError::Config(format!("{} is not a directory", dir.display())))
}

fn walker_for(root: &Path, skip: &[PathBuf]) -> TreeWalker {
    skip.iter().fold(
        TreeWalker::new(&[root.to_path_buf()], ExclusionRules::none()),
        |walker, prefix| walker.skip_prefix(prefix),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_backup_dir_name() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).expect("valid date");
        assert_eq!(backup_dir_name(date), "FSAK_240131");
    }

    #[test]
    fn test_same_directory_is_rejected() {
        let temp = TempDir::new().expect("create temp dir");
        let store = MemoryCatalog::new();
        let err = plan_merge(
            temp.path(),
            &temp.path().join("."),
            &store,
            &[],
            None,
        )
        .expect_err("same dir");
        assert!(matches!(err, FsakError::Config(_)));
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let temp = TempDir::new().expect("create temp dir");
        let store = MemoryCatalog::new();
        let err = plan_merge(&temp.path().join("nope"), temp.path(), &store, &[], None)
            .expect_err("missing source");
        assert!(matches!(err, FsakError::Config(_)));
    }

    #[test]
    fn test_nested_source_keeps_relative_layout() {
        let temp = TempDir::new().expect("create temp dir");
        let source = temp.path().join("src");
        let target = temp.path().join("dst");
        fs::create_dir_all(source.join("deep/er")).expect("create source");
        fs::create_dir_all(&target).expect("create target");
        fs::write(source.join("deep/er/n.txt"), b"novel").expect("write novel");
        let store = MemoryCatalog::new();

        let plan = plan_merge(&source, &target, &store, &[], None).expect("plan");
        let summary = execute_merge(&plan, &store, None).expect("merge");

        assert_eq!(summary.copied, 1);
        let copied = plan.backup_dir.join("deep/er/n.txt");
        assert_eq!(fs::read(&copied).expect("read copy"), b"novel");
        let row = store
            .get(&fs::canonicalize(&copied).expect("canonicalize"))
            .expect("get")
            .expect("copied file is catalogued");
        assert_eq!(row.tag, MERGE_TAG);
    }

    #[test]
    fn test_second_merge_copies_nothing() {
        let temp = TempDir::new().expect("create temp dir");
        let source = temp.path().join("src");
        let target = temp.path().join("dst");
        fs::create_dir_all(&source).expect("create source");
        fs::create_dir_all(&target).expect("create target");
        fs::write(source.join("y.txt"), b"Y").expect("write y");
        let store = MemoryCatalog::new();

        let first = plan_merge(&source, &target, &store, &[], None).expect("plan");
        execute_merge(&first, &store, None).expect("merge");
        let second = plan_merge(&source, &target, &store, &[], None).expect("replan");

        assert!(second.novel.is_empty());
    }
}
