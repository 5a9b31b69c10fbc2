//! Error types for fsak

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for fsak operations
#[derive(Debug, Error)]
pub enum FsakError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error tied to a specific file
    #[error("IO error on {path}: {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration (bad pattern, missing directory, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog backend failure
    #[error("Catalog store error: {0}")]
    Store(String),

    /// The selector could not produce an answer
    #[error("Selection error: {0}")]
    Selection(String),
}

impl FsakError {
    /// Wrap an IO error with the path it happened on
    pub fn path_io(path: &Path, source: std::io::Error) -> Self {
        FsakError::PathIo {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Errors that must stop the whole command
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FsakError::Config(_) | FsakError::Store(_) | FsakError::Selection(_)
        )
    }

    /// Errors scoped to a single file; the caller skips the file and continues
    pub fn is_per_file(&self) -> bool {
        matches!(self, FsakError::Io(_) | FsakError::PathIo { .. })
    }
}

impl From<rusqlite::Error> for FsakError {
    fn from(error: rusqlite::Error) -> Self {
        FsakError::Store(error.to_string())
    }
}
