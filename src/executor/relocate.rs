//! Move-aside operations
//!
//! Files removed by the duplicate resolver or the dirty sweep are moved
//! under a deletion directory with their position relative to the scanned
//! roots preserved. Each deletion directory carries a `MANIFEST.json` for
//! recovery and audit.

use crate::executor::copy::copy_file_atomic;
use crate::types::{Fingerprint, FsakError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::{Component, Path, PathBuf};

pub const MANIFEST_FILE: &str = "MANIFEST.json";

/// One moved file or folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Absolute path before the move
    pub original_path: String,
    /// Absolute path inside the deletion directory
    pub moved_to: String,
    /// RFC 3339 timestamp of the move
    pub moved_at: String,
    /// Size in bytes (0 for folders)
    pub size: u64,
    /// Digests of the moved content, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
}

impl MoveRecord {
    pub fn new(from: &Path, to: &Path, size: u64, fingerprint: Option<Fingerprint>) -> Self {
        Self {
            original_path: from.to_string_lossy().into_owned(),
            moved_to: to.to_string_lossy().into_owned(),
            moved_at: Local::now().to_rfc3339(),
            size,
            fingerprint,
        }
    }
}

/// Every move recorded in one deletion directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveManifest {
    pub files: Vec<MoveRecord>,
}

impl MoveManifest {
    /// Read `<dir>/MANIFEST.json`, or an empty manifest if there is none
    pub fn load(dir: &Path) -> Result<Self, FsakError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Ok(Self::default());
        }
        let content =
            fs::read_to_string(&manifest_path).map_err(|e| FsakError::path_io(&manifest_path, e))?;
        serde_json::from_str(&content).map_err(|e| FsakError::path_io(&manifest_path, e.into()))
    }

    /// Append one record to `<dir>/MANIFEST.json`
    ///
    /// Read-modify-write; not safe against a concurrent writer.
    pub fn append(dir: &Path, record: MoveRecord) -> Result<(), FsakError> {
        let mut manifest = Self::load(dir)?;
        manifest.files.push(record);

        let manifest_path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| FsakError::path_io(&manifest_path, e.into()))?;
        fs::write(&manifest_path, json).map_err(|e| FsakError::path_io(&manifest_path, e))
    }
}

/// Move a file, or a folder holding only empty folders, to `dest`
///
/// Parent directories are created. If `dest` is taken, a free sibling name
/// is used instead (`photo_1.jpg`, `photo_2.jpg`, ...). Within one
/// filesystem this is a single rename; across filesystems the file is
/// copied durably and the original removed only after the copy succeeded.
///
/// Returns the path the source now lives at.
pub fn move_path(src: &Path, dest: &Path) -> Result<PathBuf, FsakError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| FsakError::path_io(parent, e))?;
    }
    let dest = free_destination(dest);

    let metadata = fs::symlink_metadata(src).map_err(|e| FsakError::path_io(src, e))?;

    match fs::rename(src, &dest) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            if metadata.is_dir() {
                fs::create_dir_all(&dest).map_err(|e| FsakError::path_io(&dest, e))?;
                remove_empty_tree(src).map_err(|e| FsakError::path_io(src, e))?;
            } else {
                copy_file_atomic(src, &dest)?;
                fs::remove_file(src).map_err(|e| FsakError::path_io(src, e))?;
            }
        }
        Err(e) => return Err(FsakError::path_io(src, e)),
    }

    Ok(dest)
}

/// First of `dest`, `stem_1.ext`, `stem_2.ext`, ... that does not exist
pub fn free_destination(dest: &Path) -> PathBuf {
    if fs::symlink_metadata(dest).is_err() {
        return dest.to_path_buf();
    }

    let stem = dest.file_stem().unwrap_or_default();
    let ext = dest.extension();

    let mut counter = 1usize;
    loop {
        let mut name = stem.to_os_string();
        name.push(format!("_{counter}"));
        if let Some(ext) = ext {
            name.push(".");
            name.push(ext);
        }
        let candidate = dest.with_file_name(name);
        if fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        counter += 1;
    }
}

/// Directory that moved paths are made relative to
///
/// The common ancestor of the roots' parents, so the relative path still
/// starts with the root folder's own name (`/data/photos/a.jpg` with root
/// `/data/photos` lands at `<deleted>/photos/a.jpg`).
pub fn relocation_anchor(roots: &[PathBuf]) -> PathBuf {
    let mut parents = roots
        .iter()
        .map(|root| root.parent().unwrap_or(root.as_path()).to_path_buf());

    let Some(first) = parents.next() else {
        return PathBuf::new();
    };

    parents.fold(first, |common, next| {
        common
            .components()
            .zip(next.components())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a)
            .collect()
    })
}

/// Where `path` lands under `dest_root` when moved relative to `anchor`
pub fn relocated_path(path: &Path, anchor: &Path, dest_root: &Path) -> PathBuf {
    match path.strip_prefix(anchor) {
        Ok(relative) if relative.components().all(|c| matches!(c, Component::Normal(_))) => {
            dest_root.join(relative)
        }
        _ => dest_root.join(path.file_name().unwrap_or(path.as_os_str())),
    }
}

fn remove_empty_tree(dir: &Path) -> Result<(), Error> {
    for child in fs::read_dir(dir)? {
        let child = child?;
        if child.file_type()?.is_dir() {
            remove_empty_tree(&child.path())?;
        } else {
            return Err(Error::new(
                ErrorKind::DirectoryNotEmpty,
                format!("{} is not empty", dir.display()),
            ));
        }
    }
    fs::remove_dir(dir)
}
