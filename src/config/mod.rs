//! Configuration management
//!
//! Settings come from three places, strongest first: command-line flags,
//! `<workspace>/config.toml`, built-in defaults.

mod cli;
mod workspace;

pub use cli::{
    CleanCommand, CleanDirtyArgs, CleanDupArgs, Cli, Command, MergeCommand, MergeDirArgs,
    SyncCommand, SyncInfoArgs,
};
pub use workspace::{Workspace, WORKSPACE_ENV};

use crate::types::FsakError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Optional defaults read from `config.toml`
///
/// ```toml
/// threads = 4
/// batch_size = 100
/// blacklist = "/home/me/.config/fsak/blacklist.txt"
/// deleted_dir = "/mnt/spare/deleted"
/// tag = "laptop"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub threads: Option<usize>,
    pub batch_size: Option<usize>,
    pub blacklist: Option<PathBuf>,
    pub deleted_dir: Option<PathBuf>,
    pub tag: Option<String>,
}

impl FileConfig {
    /// Parse TOML text
    pub fn parse(text: &str) -> Result<Self, FsakError> {
        toml::from_str(text).map_err(|e| FsakError::Config(format!("Invalid config file: {}", e)))
    }

    /// Load `path`; a missing file means no overrides
    pub fn load(path: &Path) -> Result<Self, FsakError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(FsakError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn workers(&self, flag: Option<usize>) -> usize {
        flag.or(self.threads).unwrap_or(DEFAULT_WORKERS).max(1)
    }

    pub fn batch_size(&self, flag: Option<usize>) -> usize {
        flag.or(self.batch_size).unwrap_or(DEFAULT_BATCH_SIZE).max(1)
    }

    pub fn blacklist(&self, flag: Option<&Path>) -> Option<PathBuf> {
        flag.map(Path::to_path_buf).or_else(|| self.blacklist.clone())
    }

    pub fn tag(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.tag.clone())
            .unwrap_or_default()
    }

    /// Flag, then config file, then `<workspace>/deleted`
    pub fn deleted_dir(&self, flag: Option<&Path>, workspace: &Workspace) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.deleted_dir.clone())
            .unwrap_or_else(|| workspace.deleted_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let config = FileConfig::parse(
            "threads = 4\nbatch_size = 100\nblacklist = \"/bl.txt\"\ntag = \"nas\"\n",
        )
        .expect("parse");
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.batch_size, Some(100));
        assert_eq!(config.blacklist, Some(PathBuf::from("/bl.txt")));
        assert_eq!(config.tag.as_deref(), Some("nas"));
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        assert!(matches!(
            FileConfig::parse("thraeds = 4"),
            Err(FsakError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let temp = TempDir::new().expect("create temp dir");
        let config = FileConfig::load(&temp.path().join("config.toml")).expect("load");
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_flags_win_over_file_over_defaults() {
        let config = FileConfig {
            threads: Some(8),
            ..FileConfig::default()
        };
        assert_eq!(config.workers(Some(2)), 2);
        assert_eq!(config.workers(None), 8);
        assert_eq!(FileConfig::default().workers(None), DEFAULT_WORKERS);
        assert_eq!(FileConfig::default().batch_size(Some(0)), 1);
        assert_eq!(FileConfig::default().batch_size(None), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_deleted_dir_defaults_to_workspace() {
        let temp = TempDir::new().expect("create temp dir");
        let ws = Workspace::at(temp.path()).expect("workspace");
        assert_eq!(
            FileConfig::default().deleted_dir(None, &ws),
            temp.path().join("deleted")
        );
        assert_eq!(
            FileConfig::default().deleted_dir(Some(Path::new("/x")), &ws),
            PathBuf::from("/x")
        );
    }
}
