//! Lazy multi-root file walker

use crate::scanner::ExclusionRules;
use crate::types::FsakError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lazily yields regular files under a set of roots
///
/// Directories, symlinks and special files are never yielded. Entries that
/// cannot be read are logged and skipped; the walk itself never fails.
/// Build a new walker for every pass; a walker is consumed by iterating it.
pub struct TreeWalker {
    walk: Option<ignore::Walk>,
    rules: ExclusionRules,
    skip_prefixes: Vec<Vec<u8>>,
}

impl TreeWalker {
    pub fn new(roots: &[PathBuf], rules: ExclusionRules) -> Self {
        let walk = roots.split_first().map(|(first, rest)| {
            let mut builder = ignore::WalkBuilder::new(first);
            for root in rest {
                builder.add(root);
            }
            // Catalogue everything: hidden files and VCS-ignored files included.
            builder
                .standard_filters(false)
                .follow_links(false)
                .build()
        });

        Self {
            walk,
            rules,
            skip_prefixes: Vec::new(),
        }
    }

    /// Never yield paths starting with `prefix` (string prefix, so database
    /// sidecar files such as `fsak.db-wal` are covered too).
    pub fn skip_prefix(mut self, prefix: &Path) -> Self {
        self.skip_prefixes
            .push(prefix.as_os_str().as_encoded_bytes().to_vec());
        self
    }

    fn is_skipped(&self, path: &Path) -> bool {
        if !self.skip_prefixes.is_empty() {
            let raw = path.as_os_str().as_encoded_bytes();
            if self
                .skip_prefixes
                .iter()
                .any(|prefix| raw.starts_with(prefix))
            {
                return true;
            }
        }
        self.rules.is_excluded(path)
    }
}

impl Iterator for TreeWalker {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let result = self.walk.as_mut()?.next()?;

            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry during traversal: {}", e);
                    continue;
                }
            };

            match entry.file_type() {
                Some(ft) if ft.is_file() => {}
                _ => continue,
            }

            if self.is_skipped(entry.path()) {
                debug!("Excluded {}", entry.path().display());
                continue;
            }

            return Some(entry.into_path());
        }
    }
}

/// Validate and canonicalize root directories
///
/// Every root must exist and be a directory. Duplicates and roots nested
/// inside another root are dropped so no file is visited twice.
///
/// # Errors
/// * `FsakError::Config` when no root is given or a root is missing or not
///   a directory
pub fn canonical_roots(dirs: &[PathBuf]) -> Result<Vec<PathBuf>, FsakError> {
    if dirs.is_empty() {
        return Err(FsakError::Config(
            "At least one directory is required".to_string(),
        ));
    }

    let mut roots = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let canonical = fs::canonicalize(dir).map_err(|e| {
            FsakError::Config(format!("Directory {} is not accessible: {}", dir.display(), e))
        })?;
        if !canonical.is_dir() {
            return Err(FsakError::Config(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        roots.push(canonical);
    }

    roots.sort();
    roots.dedup();

    let mut outermost: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        if !outermost.iter().any(|kept| root.starts_with(kept)) {
            outermost.push(root);
        }
    }
    Ok(outermost)
}
