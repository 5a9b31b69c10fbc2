//! Command-line interface

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// fsak - file catalog, duplicate cleaner and content-aware merger
#[derive(Debug, Parser)]
#[command(name = "fsak")]
#[command(about = "Catalog files by content, clean duplicates and clutter, merge trees by content")]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Log at debug level (FSAK_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bring the catalog up to date
    #[command(subcommand)]
    Sync(SyncCommand),

    /// Clean the catalog, duplicates, or clutter
    #[command(subcommand)]
    Clean(CleanCommand),

    /// Merge trees by content
    #[command(subcommand)]
    Merge(MergeCommand),

    /// Print the MD5 and BLAKE3 digests of a file
    Hash {
        /// File to fingerprint
        file: PathBuf,
    },

    /// Print version information
    Version,
}

#[derive(Debug, Subcommand)]
pub enum SyncCommand {
    /// Fingerprint files under the given directories into the catalog
    Info(SyncInfoArgs),
}

#[derive(Debug, Args)]
pub struct SyncInfoArgs {
    /// Directories to catalog
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,

    /// Number of fingerprinting workers [default: 1]
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Label stamped on every entry written by this run
    #[arg(short = 'T', long)]
    pub tag: Option<String>,

    /// Re-fingerprint files that are already catalogued
    #[arg(short = 'F', long)]
    pub force: bool,

    /// Blacklist file: one `/regex/` or literal path per line
    #[arg(short = 'B', long)]
    pub blacklist: Option<PathBuf>,

    /// Entries per catalog write [default: 10]
    #[arg(short = 'b', long)]
    pub batch: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum CleanCommand {
    /// Remove catalog rows whose files no longer exist
    Info,

    /// Find duplicate files and move the copies you pick aside
    Dup(CleanDupArgs),

    /// Find clutter (empty, tiny, hidden, temp files, empty folders)
    Dirty(CleanDirtyArgs),
}

#[derive(Debug, Args)]
pub struct CleanDupArgs {
    /// Directories to search
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,

    /// Where removed copies are moved [default: <workspace>/deleted]
    #[arg(short = 'd', long = "deleted-dir")]
    pub deleted_dir: Option<PathBuf>,

    /// Blacklist file: one `/regex/` or literal path per line
    #[arg(short = 'B', long)]
    pub blacklist: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CleanDirtyArgs {
    /// Directories to sweep
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,

    /// Only list what would be moved
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Where dirty files are moved [default: <workspace>/deleted]
    #[arg(short = 'd', long = "delete-to-dir")]
    pub delete_to_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum MergeCommand {
    /// Copy files whose content is missing from --to into a dated backup folder
    Dir(MergeDirArgs),
}

#[derive(Debug, Args)]
pub struct MergeDirArgs {
    /// Source directory
    #[arg(short = 'f', long)]
    pub from: PathBuf,

    /// Target directory
    #[arg(short = 't', long)]
    pub to: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_info_flags() {
        let cli = Cli::try_parse_from([
            "fsak", "sync", "info", "/a", "/b", "-t", "4", "-T", "nas", "-F", "-B", "bl.txt",
            "-b", "50",
        ])
        .expect("parse");

        let Command::Sync(SyncCommand::Info(args)) = cli.command else {
            panic!("expected sync info");
        };
        assert_eq!(args.dirs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(args.threads, Some(4));
        assert_eq!(args.tag.as_deref(), Some("nas"));
        assert!(args.force);
        assert_eq!(args.blacklist, Some(PathBuf::from("bl.txt")));
        assert_eq!(args.batch, Some(50));
    }

    #[test]
    fn test_sync_info_requires_a_directory() {
        assert!(Cli::try_parse_from(["fsak", "sync", "info"]).is_err());
    }

    #[test]
    fn test_parse_merge_dir() {
        let cli = Cli::try_parse_from(["fsak", "merge", "dir", "-f", "/src", "-t", "/dst"])
            .expect("parse");
        let Command::Merge(MergeCommand::Dir(args)) = cli.command else {
            panic!("expected merge dir");
        };
        assert_eq!(args.from, PathBuf::from("/src"));
        assert_eq!(args.to, PathBuf::from("/dst"));
    }

    #[test]
    fn test_parse_clean_dirty_list() {
        let cli = Cli::try_parse_from(["fsak", "clean", "dirty", "/x", "-l"]).expect("parse");
        let Command::Clean(CleanCommand::Dirty(args)) = cli.command else {
            panic!("expected clean dirty");
        };
        assert!(args.list);
        assert!(args.delete_to_dir.is_none());
    }
}
