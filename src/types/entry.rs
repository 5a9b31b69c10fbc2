//! CatalogEntry - One catalogued file and its content fingerprint

use crate::hash::{fingerprint_file, path_key};
use crate::types::FsakError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

/// Content identity of a file: two independent digests from one read
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint {
    /// MD5, lowercase hex (32 chars)
    pub legacy: String,
    /// BLAKE3-256, lowercase hex (64 chars)
    pub strong: String,
}

impl Fingerprint {
    pub fn new(legacy: impl Into<String>, strong: impl Into<String>) -> Self {
        Self {
            legacy: legacy.into(),
            strong: strong.into(),
        }
    }

    /// Both digests present
    pub fn is_complete(&self) -> bool {
        !self.legacy.is_empty() && !self.strong.is_empty()
    }
}

/// Exists/missing marker. Only `Exists` is written today; stale rows are
/// deleted rather than flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntryStatus {
    #[default]
    Exists,
    Missing,
}

impl EntryStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            EntryStatus::Exists => 0,
            EntryStatus::Missing => 1,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value == 1 {
            EntryStatus::Missing
        } else {
            EntryStatus::Exists
        }
    }
}

/// One row of the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// BLAKE3 hex of the absolute path; primary lookup key
    pub key: String,

    /// File name component
    pub name: String,

    /// Absolute, canonical path
    pub path: PathBuf,

    pub fingerprint: Fingerprint,

    /// File size in bytes
    pub size: u64,

    /// Last modification time (UTC)
    pub modified: DateTime<Utc>,

    /// Status change time on Unix, creation time elsewhere
    pub changed: DateTime<Utc>,

    /// Free-form batch label set at sync time
    pub tag: String,

    pub status: EntryStatus,
}

impl CatalogEntry {
    /// Build an entry for an already canonical path from its metadata and fingerprint
    pub fn from_parts(
        path: PathBuf,
        metadata: &Metadata,
        fingerprint: Fingerprint,
        tag: &str,
    ) -> Result<Self, FsakError> {
        let modified = metadata
            .modified()
            .map_err(|e| FsakError::path_io(&path, e))?;

        Ok(Self {
            key: path_key(&path),
            name: file_name_of(&path),
            changed: change_time(metadata).unwrap_or_else(|| DateTime::<Utc>::from(modified)),
            modified: DateTime::<Utc>::from(modified),
            size: metadata.len(),
            fingerprint,
            tag: tag.to_string(),
            status: EntryStatus::Exists,
            path,
        })
    }

    /// Canonicalize `path`, stat it and fingerprint it in a single read
    pub fn from_path(path: &Path, tag: &str) -> Result<Self, FsakError> {
        let absolute = fs::canonicalize(path).map_err(|e| FsakError::path_io(path, e))?;
        let metadata = fs::metadata(&absolute).map_err(|e| FsakError::path_io(&absolute, e))?;
        let fingerprint = fingerprint_file(&absolute)?;
        Self::from_parts(absolute, &metadata, fingerprint, tag)
    }

    /// Content-identical means both digests match
    pub fn same_content(&self, other: &CatalogEntry) -> bool {
        self.fingerprint == other.fingerprint
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(unix)]
fn change_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    use std::os::unix::fs::MetadataExt;
    DateTime::<Utc>::from_timestamp(metadata.ctime(), metadata.ctime_nsec() as u32)
}

#[cfg(not(unix))]
fn change_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    metadata.created().ok().map(DateTime::<Utc>::from)
}
