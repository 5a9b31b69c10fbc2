//! Dirty-file sweep: junk files and empty folders

use crate::catalog::CatalogStore;
use crate::executor::{move_path, relocated_path, relocation_anchor, MoveManifest, MoveRecord};
use crate::hash::path_key;
use crate::types::{file_name_of, FsakError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SMALL_FILE_LIMIT: u64 = 1024;
const OFFICE_TEMP_EXTENSIONS: [&str; 6] = ["tmp", "temp", "asd", "wbk", "xlk", "tmp2"];

/// Kinds of clutter the sweep can collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirtyCategory {
    EmptyFile,
    SmallFile,
    DsStore,
    ThumbsDb,
    EmptyFolder,
    HiddenFile,
    OfficeTemp,
}

impl DirtyCategory {
    pub const ALL: [DirtyCategory; 7] = [
        DirtyCategory::EmptyFile,
        DirtyCategory::SmallFile,
        DirtyCategory::DsStore,
        DirtyCategory::ThumbsDb,
        DirtyCategory::EmptyFolder,
        DirtyCategory::HiddenFile,
        DirtyCategory::OfficeTemp,
    ];

    /// A file matching several categories is filed under the first one
    /// in this order.
    const FILE_PRECEDENCE: [DirtyCategory; 6] = [
        DirtyCategory::DsStore,
        DirtyCategory::ThumbsDb,
        DirtyCategory::OfficeTemp,
        DirtyCategory::EmptyFile,
        DirtyCategory::SmallFile,
        DirtyCategory::HiddenFile,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DirtyCategory::EmptyFile => "Files with size 0",
            DirtyCategory::SmallFile => "Files smaller than 1KB",
            DirtyCategory::DsStore => "macOS .DS_Store files",
            DirtyCategory::ThumbsDb => "Windows Thumbs.db files",
            DirtyCategory::EmptyFolder => "Empty folders",
            DirtyCategory::HiddenFile => "Hidden files (starting with .)",
            DirtyCategory::OfficeTemp => "Office temporary files",
        }
    }

    fn matches_file(self, name: &str, size: u64) -> bool {
        match self {
            DirtyCategory::EmptyFile => size == 0,
            DirtyCategory::SmallFile => size > 0 && size < SMALL_FILE_LIMIT,
            DirtyCategory::DsStore => name == ".DS_Store",
            DirtyCategory::ThumbsDb => name == "Thumbs.db",
            DirtyCategory::HiddenFile => name.starts_with('.'),
            DirtyCategory::OfficeTemp => is_office_temp(name),
            DirtyCategory::EmptyFolder => false,
        }
    }
}

/// One file or folder selected by the sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyItem {
    pub path: PathBuf,
    pub category: DirtyCategory,
    pub size: u64,
    pub is_dir: bool,
}

/// Totals for a sweep that moved files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySummary {
    pub moved: usize,
    pub failed: usize,
    pub rows_removed: usize,
}

/// `~$report.docx`, `draft.tmp`, `book~.xlsx`
fn is_office_temp(name: &str) -> bool {
    if name.starts_with("~$") {
        return true;
    }
    let path = Path::new(name);
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_ascii_lowercase();
        if OFFICE_TEMP_EXTENSIONS.contains(&ext.as_str()) {
            return true;
        }
    }
    path.file_stem()
        .is_some_and(|stem| stem.to_string_lossy().ends_with('~'))
}

/// A folder whose subtree holds no files, only (possibly nested) folders
fn is_empty_folder(dir: &Path) -> io::Result<bool> {
    for child in fs::read_dir(dir)? {
        let child = child?;
        if !child.file_type()?.is_dir() || !is_empty_folder(&child.path())? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Collect dirty items under `roots` for the given categories
///
/// Roots themselves are never reported. Of nested empty folders only the
/// outermost is reported. Symlinks are neither followed nor reported.
pub fn find_dirty(
    roots: &[PathBuf],
    categories: &[DirtyCategory],
    skip: &[PathBuf],
) -> Vec<DirtyItem> {
    let Some((first, rest)) = roots.split_first() else {
        return Vec::new();
    };
    let mut builder = ignore::WalkBuilder::new(first);
    for root in rest {
        builder.add(root);
    }
    let walk = builder.standard_filters(false).follow_links(false).build();

    let want_folders = categories.contains(&DirtyCategory::EmptyFolder);
    let mut items = Vec::new();
    let mut empty_folders: Vec<PathBuf> = Vec::new();

    for result in walk {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry during sweep: {}", e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        let skipped = {
            let raw = path.as_os_str().as_encoded_bytes();
            skip.iter()
                .any(|prefix| raw.starts_with(prefix.as_os_str().as_encoded_bytes()))
        };
        if skipped {
            continue;
        }
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if !want_folders || empty_folders.iter().any(|outer| path.starts_with(outer)) {
                continue;
            }
            match is_empty_folder(path) {
                Ok(true) => {
                    empty_folders.push(path.to_path_buf());
                    items.push(DirtyItem {
                        path: path.to_path_buf(),
                        category: DirtyCategory::EmptyFolder,
                        size: 0,
                        is_dir: true,
                    });
                }
                Ok(false) => {}
                Err(e) => debug!("Cannot inspect {}: {}", path.display(), e),
            }
        } else if file_type.is_file() {
            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let name = file_name_of(path);
            let category = DirtyCategory::FILE_PRECEDENCE
                .into_iter()
                .filter(|c| categories.contains(c))
                .find(|c| c.matches_file(&name, size));
            if let Some(category) = category {
                items.push(DirtyItem {
                    path: path.to_path_buf(),
                    category,
                    size,
                    is_dir: false,
                });
            }
        }
    }

    items
}

/// Move dirty items under `dest_dir` and drop catalog rows of moved files
///
/// Items keep their position relative to the roots' common parent. Failures
/// are logged and counted; the sweep continues with the next item.
pub fn move_dirty(
    items: &[DirtyItem],
    roots: &[PathBuf],
    dest_dir: &Path,
    store: &dyn CatalogStore,
) -> Result<DirtySummary, FsakError> {
    let anchor = relocation_anchor(roots);
    let mut summary = DirtySummary::default();

    for item in items {
        let dest = relocated_path(&item.path, &anchor, dest_dir);
        let moved_to = match move_path(&item.path, &dest) {
            Ok(moved_to) => moved_to,
            Err(error) if error.is_per_file() => {
                warn!("Could not move {}: {}", item.path.display(), error);
                summary.failed += 1;
                continue;
            }
            Err(error) => return Err(error),
        };
        summary.moved += 1;

        if let Err(e) =
            MoveManifest::append(dest_dir, MoveRecord::new(&item.path, &moved_to, item.size, None))
        {
            warn!("Could not record {} in manifest: {}", moved_to.display(), e);
        }

        if !item.is_dir && store.delete(&path_key(&item.path))? {
            summary.rows_removed += 1;
        }
    }

    info!("Moved {} dirty item(s), {} failed", summary.moved, summary.failed);
    Ok(summary)
}
