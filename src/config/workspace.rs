//! Workspace directory: catalog database, logs, deletion area, config file

use crate::types::FsakError;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the workspace location
pub const WORKSPACE_ENV: &str = "FSAK_WS_DIR";

/// Layout of the workspace directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// `$FSAK_WS_DIR`, else `$HOME/.local/share/fsak`
    pub fn from_env() -> Result<Self, FsakError> {
        let root = resolve_root(
            std::env::var_os(WORKSPACE_ENV),
            std::env::var_os("HOME"),
        )?;
        Ok(Self { root })
    }

    /// Workspace rooted at `root` (made absolute)
    pub fn at(root: &Path) -> Result<Self, FsakError> {
        Ok(Self {
            root: absolute(root)?,
        })
    }

    /// Create the workspace folders if missing
    pub fn ensure(&self) -> Result<(), FsakError> {
        for dir in [self.root.join("db"), self.logs_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                FsakError::Config(format!(
                    "Cannot create workspace directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join("db").join("fsak.db")
    }

    /// Default destination for duplicates and dirty files
    pub fn deleted_dir(&self) -> PathBuf {
        self.root.join("deleted")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}

fn resolve_root(ws_dir: Option<OsString>, home: Option<OsString>) -> Result<PathBuf, FsakError> {
    if let Some(dir) = ws_dir.filter(|d| !d.is_empty()) {
        return absolute(Path::new(&dir));
    }
    match home.filter(|h| !h.is_empty()) {
        Some(home) => Ok(PathBuf::from(home).join(".local/share/fsak")),
        None => Err(FsakError::Config(format!(
            "Neither {} nor HOME is set; cannot locate the workspace",
            WORKSPACE_ENV
        ))),
    }
}

fn absolute(path: &Path) -> Result<PathBuf, FsakError> {
    std::path::absolute(path).map_err(|e| {
        FsakError::Config(format!(
            "Cannot resolve workspace path {}: {}",
            path.display(),
            e
        ))
    })
}
