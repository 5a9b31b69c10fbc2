//! Subcommand drivers: wire configuration, catalog, progress and selector
//! to the library operations and print results.

pub mod clean;
pub mod dedupe;
pub mod hash;
pub mod merge;
pub mod sync;

use crate::catalog::SqliteCatalog;
use crate::config::{CleanCommand, Command, FileConfig, MergeCommand, SyncCommand, Workspace};
use crate::logging::init_logging;
use crate::types::FsakError;
use crate::ui::TermSelector;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;

/// Run one parsed subcommand
///
/// `hash` and `version` run without a workspace. Every other command
/// resolves the workspace, starts file logging under it and loads
/// `config.toml` before doing any work.
pub fn run(command: Command, verbose: bool) -> Result<(), FsakError> {
    match command {
        Command::Version => {
            println!("{}", version_line());
            Ok(())
        }
        Command::Hash { file } => {
            let _guard = init_logging(None, verbose);
            hash::run(&file)
        }
        Command::Sync(SyncCommand::Info(args)) => {
            let session = Session::open(verbose)?;
            sync::run(&args, &session.workspace, &session.config).map(|_| ())
        }
        Command::Clean(CleanCommand::Info) => {
            let session = Session::open(verbose)?;
            clean::run_info(&session.workspace).map(|_| ())
        }
        Command::Clean(CleanCommand::Dup(args)) => {
            let session = Session::open(verbose)?;
            let mut selector = TermSelector::new();
            dedupe::run(&args, &session.workspace, &session.config, &mut selector).map(|_| ())
        }
        Command::Clean(CleanCommand::Dirty(args)) => {
            let session = Session::open(verbose)?;
            let mut selector = TermSelector::new();
            clean::run_dirty(&args, &session.workspace, &session.config, &mut selector)
                .map(|_| ())
        }
        Command::Merge(MergeCommand::Dir(args)) => {
            let session = Session::open(verbose)?;
            merge::run(&args, &session.workspace).map(|_| ())
        }
    }
}

/// Workspace, file config and the log guard for one command
struct Session {
    workspace: Workspace,
    config: FileConfig,
    _guard: Option<WorkerGuard>,
}

impl Session {
    fn open(verbose: bool) -> Result<Self, FsakError> {
        let workspace = Workspace::from_env()?;
        workspace.ensure()?;
        let guard = init_logging(Some(&workspace.logs_dir()), verbose);
        tracing::info!("Workspace directory: {}", workspace.root().display());
        let config = FileConfig::load(&workspace.config_path())?;
        Ok(Self {
            workspace,
            config,
            _guard: guard,
        })
    }
}

/// `fsak v0.1.0`
pub fn version_line() -> String {
    format!("fsak v{}", crate::VERSION)
}

fn open_catalog(workspace: &Workspace) -> Result<SqliteCatalog, FsakError> {
    workspace.ensure()?;
    SqliteCatalog::open(&workspace.db_path())
}

/// Paths a scan must never visit: the catalog database and its sidecars
fn catalog_skip(workspace: &Workspace) -> Vec<PathBuf> {
    vec![workspace.db_path()]
}

#[derive(Debug)]
struct ErrorRecord {
    kind: &'static str,
    path: PathBuf,
    message: String,
}

impl ErrorRecord {
    fn new(path: &Path, message: &str) -> Self {
        Self {
            kind: error_kind_label(message),
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Group per-file failures by the `io::ErrorKind` named in the message
fn error_kind_label(message: &str) -> &'static str {
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission denied") {
        "Permission denied"
    } else if lower.contains("no such file") || lower.contains("not found") {
        "Vanished during run"
    } else {
        "I/O error"
    }
}

fn io_kind_hint(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::PermissionDenied => {
            Some("Check file permissions or run with a user that has access.")
        }
        ErrorKind::NotFound => Some("The file was removed while fsak was running; re-run to refresh."),
        _ => None,
    }
}

fn format_error_summary(records: &[ErrorRecord]) -> String {
    let mut groups: BTreeMap<&'static str, Vec<&ErrorRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.kind).or_default().push(record);
    }

    let mut lines = Vec::new();
    lines.push("Skipped files:".to_string());
    for (kind, items) in groups {
        lines.push(format!("  {} ({}):", kind, items.len()));
        for record in items.iter().take(3) {
            lines.push(format!("    - {}", record.path.display()));
            lines.push(format!("      {}", record.message));
        }
        if items.len() > 3 {
            lines.push(format!("    - ... {} more (see the log file)", items.len() - 3));
        }
    }
    lines.join("\n")
}

/// Top-level message for a command failure, with a hint where one helps
pub fn describe_error(error: &FsakError) -> String {
    let hint = match error {
        FsakError::Io(io) | FsakError::PathIo { source: io, .. } => io_kind_hint(io.kind()),
        FsakError::Store(_) => Some("The catalog database may be locked or corrupt."),
        FsakError::Config(_) | FsakError::Selection(_) => None,
    };
    match hint {
        Some(hint) => format!("{}\n  Try: {}", error, hint),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_summary_groups_by_kind() {
        let records = vec![
            ErrorRecord::new(Path::new("a.txt"), "IO error on a.txt: Permission denied (os error 13)"),
            ErrorRecord::new(Path::new("b.txt"), "IO error on b.txt: No such file or directory (os error 2)"),
            ErrorRecord::new(Path::new("c.txt"), "IO error on c.txt: Permission denied (os error 13)"),
        ];

        let summary = format_error_summary(&records);
        assert!(summary.contains("Skipped files:"));
        assert!(summary.contains("Permission denied (2):"));
        assert!(summary.contains("Vanished during run (1):"));
        assert!(summary.contains("a.txt"));
    }

    #[test]
    fn test_summary_truncates_long_groups() {
        let records: Vec<_> = (0..5)
            .map(|i| ErrorRecord::new(Path::new(&format!("{i}.txt")), "disk exploded"))
            .collect();
        let summary = format_error_summary(&records);
        assert!(summary.contains("I/O error (5):"));
        assert!(summary.contains("... 2 more"));
    }

    #[test]
    fn test_describe_error_adds_hint() {
        let error = FsakError::path_io(
            Path::new("/x"),
            std::io::Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert!(describe_error(&error).contains("Try: Check file permissions"));
        assert_eq!(
            describe_error(&FsakError::Config("bad".to_string())),
            "Configuration error: bad"
        );
    }

    #[test]
    fn test_version_line() {
        assert!(version_line().starts_with("fsak v"));
    }

    #[test]
    fn test_hash_and_version_need_no_workspace() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let file = temp.path().join("abc.txt");
        std::fs::write(&file, b"abc").expect("write file");

        run(Command::Version, false).expect("version");
        run(Command::Hash { file: file.clone() }, false).expect("hash");

        let missing = run(
            Command::Hash {
                file: temp.path().join("missing.bin"),
            },
            false,
        );
        assert!(missing.is_err_and(|e| e.is_per_file()));
    }
}
