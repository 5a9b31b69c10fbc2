//! Duplicate resolver
//!
//! Two phases that never overlap:
//! 1. `find_duplicates` fingerprints every file under the roots (reusing
//!    catalog digests) and groups content-identical files
//! 2. `resolve_duplicates` walks the groups one at a time, asks the
//!    selector which members to discard, and moves each chosen member
//!    aside before asking about the next group

use crate::catalog::{fingerprint_tree, CatalogStore, ScanCallback};
use crate::executor::{move_path, relocated_path, relocation_anchor, MoveManifest, MoveRecord};
use crate::scanner::{ExclusionRules, TreeWalker};
use crate::types::{CatalogEntry, Fingerprint, FsakError};
use crate::ui::Selector;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Content-identical files, sorted by path
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub fingerprint: Fingerprint,
    pub members: Vec<CatalogEntry>,
}

impl DuplicateGroup {
    /// Bytes that would be freed by keeping a single copy
    pub fn redundant_bytes(&self) -> u64 {
        self.members
            .iter()
            .skip(1)
            .map(|m| m.size)
            .sum()
    }
}

/// Result of the grouping phase
#[derive(Debug, Default)]
pub struct DuplicateScan {
    /// Roots the scan covered; moved files keep their position relative to these
    pub roots: Vec<PathBuf>,
    /// Groups ordered by their first member's path
    pub groups: Vec<DuplicateGroup>,
    pub scanned: usize,
    pub cached: usize,
    pub failed: usize,
}

/// Totals for a resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupeSummary {
    pub groups: usize,
    pub moved: usize,
    pub failed: usize,
    /// Catalog rows removed for moved files
    pub rows_removed: usize,
    pub bytes_moved: u64,
}

/// Fingerprint everything under `roots` and group identical content
///
/// `roots` should come from `scanner::canonical_roots`. Only per-file
/// errors are tolerated; a store failure aborts before anything is moved.
pub fn find_duplicates(
    roots: &[PathBuf],
    store: &dyn CatalogStore,
    rules: ExclusionRules,
    skip_prefixes: &[PathBuf],
    on_event: Option<&ScanCallback<'_>>,
) -> Result<DuplicateScan, FsakError> {
    let walker = skip_prefixes
        .iter()
        .fold(TreeWalker::new(roots, rules), |walker, prefix| {
            walker.skip_prefix(prefix)
        });

    let scan = fingerprint_tree(walker, store, "", on_event)?;
    let scanned = scan.entries.len();

    let mut by_content: BTreeMap<Fingerprint, Vec<CatalogEntry>> = BTreeMap::new();
    for entry in scan.entries {
        by_content
            .entry(entry.fingerprint.clone())
            .or_default()
            .push(entry);
    }

    let mut groups: Vec<DuplicateGroup> = by_content
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(fingerprint, mut members)| {
            members.sort_by(|a, b| a.path.cmp(&b.path));
            DuplicateGroup {
                fingerprint,
                members,
            }
        })
        .collect();
    groups.sort_by(|a, b| a.members[0].path.cmp(&b.members[0].path));

    info!(
        "Scanned {} files, {} duplicate group(s)",
        scanned,
        groups.len()
    );

    Ok(DuplicateScan {
        roots: roots.to_vec(),
        groups,
        scanned,
        cached: scan.cached,
        failed: scan.failed.len(),
    })
}

/// Label shown to the selector for one group member
pub fn member_label(entry: &CatalogEntry) -> String {
    format!("{} | ({} bytes)", entry.path.display(), entry.size)
}

/// Ask about each group and move the chosen members to `deleted_dir`
///
/// For every chosen member: move it (preserving its position relative to
/// the roots' common parent), append it to `deleted_dir/MANIFEST.json`,
/// then drop its catalog row. A failed move is counted and skipped; a
/// failed row delete after a successful move is only logged.
pub fn resolve_duplicates(
    scan: &DuplicateScan,
    store: &dyn CatalogStore,
    selector: &mut dyn Selector,
    deleted_dir: &Path,
) -> Result<DedupeSummary, FsakError> {
    let anchor = relocation_anchor(&scan.roots);
    let mut summary = DedupeSummary {
        groups: scan.groups.len(),
        ..DedupeSummary::default()
    };

    for (index, group) in scan.groups.iter().enumerate() {
        let labels: Vec<String> = group.members.iter().map(member_label).collect();
        let prompt = format!(
            "Duplicate group {}/{} ({} copies). Select the files to remove:",
            index + 1,
            scan.groups.len(),
            group.members.len()
        );
        let chosen = selector.select_many(&prompt, &labels)?;

        for choice in chosen {
            let Some(member) = group.members.get(choice) else {
                warn!("Ignoring out-of-range selection {}", choice);
                continue;
            };
            let dest = relocated_path(&member.path, &anchor, deleted_dir);
            match remove_member(member, &dest, store, deleted_dir) {
                Ok(row_removed) => {
                    summary.moved += 1;
                    summary.bytes_moved += member.size;
                    if row_removed {
                        summary.rows_removed += 1;
                    }
                }
                Err(error) if error.is_per_file() => {
                    warn!("Could not move {}: {}", member.path.display(), error);
                    summary.failed += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    Ok(summary)
}

/// Move one member aside, then forget it in the catalog
fn remove_member(
    member: &CatalogEntry,
    dest: &Path,
    store: &dyn CatalogStore,
    deleted_dir: &Path,
) -> Result<bool, FsakError> {
    let moved_to = move_path(&member.path, dest)?;
    info!("Moved {} to {}", member.path.display(), moved_to.display());

    let record = MoveRecord::new(
        &member.path,
        &moved_to,
        member.size,
        Some(member.fingerprint.clone()),
    );
    if let Err(e) = MoveManifest::append(deleted_dir, record) {
        warn!("Could not record {} in manifest: {}", moved_to.display(), e);
    }

    match store.delete(&member.key) {
        Ok(true) => Ok(true),
        Ok(false) => {
            warn!("No catalog row for {}", member.path.display());
            Ok(false)
        }
        Err(e) => {
            warn!(
                "Moved {} but could not delete its catalog row: {}",
                member.path.display(),
                e
            );
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::scanner::canonical_roots;
    use std::collections::VecDeque;
    use std::fs;
    use tempfile::TempDir;

    struct Scripted(VecDeque<Vec<usize>>);

    impl Selector for Scripted {
        fn select_one(&mut self, _: &str, _: &[String]) -> Result<usize, FsakError> {
            Ok(0)
        }
        fn select_many(&mut self, _: &str, _: &[String]) -> Result<Vec<usize>, FsakError> {
            Ok(self.0.pop_front().unwrap_or_default())
        }
        fn confirm(&mut self, _: &str, default: bool) -> Result<bool, FsakError> {
            Ok(default)
        }
    }

    fn tree() -> (TempDir, Vec<PathBuf>) {
        let temp = TempDir::new().expect("create temp dir");
        let root = temp.path().join("photos");
        fs::create_dir_all(root.join("sub")).expect("create dirs");
        fs::write(root.join("a.jpg"), b"same").expect("write a");
        fs::write(root.join("sub/b.jpg"), b"same").expect("write b");
        fs::write(root.join("c.jpg"), b"unique").expect("write c");
        fs::write(root.join("d.txt"), b"pair").expect("write d");
        fs::write(root.join("e.txt"), b"pair").expect("write e");
        let roots = canonical_roots(&[root]).expect("roots");
        (temp, roots)
    }

    #[test]
    fn test_groups_are_sorted_and_exclude_singletons() {
        let (_temp, roots) = tree();
        let store = MemoryCatalog::new();

        let scan =
            find_duplicates(&roots, &store, ExclusionRules::none(), &[], None).expect("scan");

        assert_eq!(scan.scanned, 5);
        assert_eq!(scan.groups.len(), 2);
        let first: Vec<_> = scan.groups[0]
            .members
            .iter()
            .map(|m| m.name.clone())
            .collect();
        assert_eq!(first, vec!["a.jpg", "b.jpg"]);
        assert_eq!(scan.groups[0].redundant_bytes(), 4);
        assert_eq!(store.count().expect("count"), 5);
    }

    #[test]
    fn test_resolve_moves_only_chosen_members() {
        let (temp, roots) = tree();
        let store = MemoryCatalog::new();
        let scan =
            find_duplicates(&roots, &store, ExclusionRules::none(), &[], None).expect("scan");
        let deleted = temp.path().join("deleted");

        let mut selector = Scripted(VecDeque::from(vec![vec![1], vec![]]));
        let summary = resolve_duplicates(&scan, &store, &mut selector, &deleted).expect("resolve");

        assert_eq!(summary.moved, 1);
        assert_eq!(summary.rows_removed, 1);
        assert!(!roots[0].join("sub/b.jpg").exists());
        assert!(roots[0].join("a.jpg").exists());
        assert!(deleted.join("photos/sub/b.jpg").exists());
        assert_eq!(store.count().expect("count"), 4);

        let manifest = MoveManifest::load(&deleted).expect("manifest");
        assert_eq!(manifest.files.len(), 1);
    }

    #[test]
    fn test_vanished_member_is_counted_not_fatal() {
        let (temp, roots) = tree();
        let store = MemoryCatalog::new();
        let scan =
            find_duplicates(&roots, &store, ExclusionRules::none(), &[], None).expect("scan");
        fs::remove_file(roots[0].join("a.jpg")).expect("remove a");

        let mut selector = Scripted(VecDeque::from(vec![vec![0, 1]]));
        let summary = resolve_duplicates(&scan, &store, &mut selector, &temp.path().join("del"))
            .expect("resolve");

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.moved, 1);
    }

    #[test]
    fn test_member_label() {
        let temp = TempDir::new().expect("create temp dir");
        let file = temp.path().join("x.bin");
        fs::write(&file, b"12345").expect("write file");
        let entry = CatalogEntry::from_path(&file, "").expect("entry");
        assert!(member_label(&entry).ends_with("x.bin | (5 bytes)"));
    }
}
