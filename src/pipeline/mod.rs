//! Sync pipeline: walk, fingerprint in parallel, commit through one writer
//!
//! Layout:
//! - a blocking feeder walks the roots into a bounded path queue
//! - `workers` tasks claim the next path from the shared queue, check the
//!   catalog and fingerprint on the blocking pool
//! - a single collector owns the batch buffer and every counter, and is
//!   the only task that writes to the catalog
//!
//! Shutdown is by channel closure: the feeder drops its sender when the
//! walk ends, workers drop theirs when the queue is drained, and the
//! collector flushes the final partial batch once every sender is gone.

mod collector;

use crate::catalog::CatalogStore;
use crate::scanner::{ExclusionRules, TreeWalker};
use crate::types::{CatalogEntry, FsakError};
use collector::Collector;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Builder;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// Settings for one sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Fingerprinting parallelism
    pub workers: usize,
    /// Label stamped on every entry written in this run
    pub tag: String,
    /// Re-fingerprint paths that are already catalogued
    pub force: bool,
    /// Entries per catalog write
    pub batch_size: usize,
    pub rules: ExclusionRules,
    /// Extra path prefixes never visited (the catalog database itself)
    pub skip_prefixes: Vec<PathBuf>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            tag: String::new(),
            force: false,
            batch_size: 10,
            rules: ExclusionRules::none(),
            skip_prefixes: Vec::new(),
        }
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Paths found by the counting pass
    pub total: usize,
    /// Entries upserted
    pub committed: usize,
    /// Paths already catalogued and left alone
    pub skipped: usize,
    /// Paths that could not be stat'd or fingerprinted
    pub failed: usize,
    /// Catalog write units
    pub batches: usize,
}

/// Events emitted while a sync runs
#[derive(Debug)]
pub enum SyncEvent {
    /// Counting pass finished
    Counted { total: usize },
    /// An entry is durably in the catalog
    Committed {
        processed: usize,
        total: usize,
        percent: f64,
        path: PathBuf,
    },
    /// A path was skipped because of a per-file error
    Failed { path: PathBuf, error: String },
    /// Final batch flushed
    Complete { summary: SyncSummary },
}

/// Callback used to receive sync events
pub type SyncCallback<'a> = dyn Fn(&SyncEvent) + Send + Sync + 'a;

/// What a worker learned about one path
#[derive(Debug)]
enum WorkerReport {
    Entry(CatalogEntry),
    Known(PathBuf),
    Failed { path: PathBuf, error: FsakError },
}

fn build_walker(roots: &[PathBuf], options: &SyncOptions) -> TreeWalker {
    options
        .skip_prefixes
        .iter()
        .fold(TreeWalker::new(roots, options.rules.clone()), |walker, prefix| {
            walker.skip_prefix(prefix)
        })
}

/// Bring the catalog up to date for `roots`
///
/// `roots` should come from `scanner::canonical_roots`.
///
/// # Errors
/// * `FsakError::Store` if the catalog fails; the run stops after the
///   workers drain
/// * `FsakError::Io` if the runtime cannot be built
///
/// Per-file failures never abort the run; they surface as
/// `SyncEvent::Failed` and in `SyncSummary::failed`.
pub fn run_sync(
    roots: &[PathBuf],
    options: &SyncOptions,
    store: Arc<dyn CatalogStore>,
    on_event: Option<&SyncCallback<'_>>,
) -> Result<SyncSummary, FsakError> {
    let workers = options.workers.max(1);
    let batch_size = options.batch_size.max(1);

    info!("Counting files under {} root(s)", roots.len());
    let total = build_walker(roots, options).count();
    if let Some(callback) = on_event {
        callback(&SyncEvent::Counted { total });
    }
    info!("Total files to process: {}", total);

    let runtime = Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .map_err(FsakError::Io)?;

    runtime.block_on(async {
        let (path_tx, path_rx) = mpsc::channel::<PathBuf>(workers * 2);
        let (report_tx, report_rx) = mpsc::channel::<WorkerReport>(workers * 2);

        let feeder = {
            let roots = roots.to_vec();
            let options = options.clone();
            tokio::task::spawn_blocking(move || feed_paths(build_walker(&roots, &options), path_tx))
        };

        let path_rx = Arc::new(Mutex::new(path_rx));
        let tag: Arc<str> = Arc::from(options.tag.as_str());
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&path_rx),
                report_tx.clone(),
                Arc::clone(&store),
                Arc::clone(&tag),
                options.force,
            )));
        }
        // Only workers may keep the queue and report channel alive.
        drop(path_rx);
        drop(report_tx);

        let outcome = Collector::new(Arc::clone(&store), batch_size, total, on_event)
            .run(report_rx)
            .await;

        let mut join_error = None;
        for handle in handles {
            if let Err(e) = handle.await {
                join_error.get_or_insert(map_join_error(e));
            }
        }
        if let Err(e) = feeder.await {
            join_error.get_or_insert(map_join_error(e));
        }

        let summary = outcome?;
        match join_error {
            Some(error) => Err(error),
            None => Ok(summary),
        }
    })
}

fn feed_paths(walker: TreeWalker, path_tx: mpsc::Sender<PathBuf>) -> usize {
    let mut sent = 0usize;
    for path in walker {
        if path_tx.blocking_send(path).is_err() {
            debug!("Path queue closed early, stopping walk after {} paths", sent);
            break;
        }
        sent += 1;
    }
    sent
}

async fn worker_loop(
    worker_id: usize,
    paths: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    reports: mpsc::Sender<WorkerReport>,
    store: Arc<dyn CatalogStore>,
    tag: Arc<str>,
    force: bool,
) {
    debug!("Worker {} started", worker_id);
    let mut handled = 0usize;

    loop {
        let next = { paths.lock().await.recv().await };
        let Some(path) = next else { break };

        let store = Arc::clone(&store);
        let tag = Arc::clone(&tag);
        let report = match tokio::task::spawn_blocking({
            let path = path.clone();
            move || inspect_path(&path, store.as_ref(), &tag, force)
        })
        .await
        {
            Ok(report) => report,
            Err(e) => WorkerReport::Failed {
                path,
                error: map_join_error(e),
            },
        };

        if reports.send(report).await.is_err() {
            debug!("Collector stopped, worker {} exiting", worker_id);
            break;
        }
        handled += 1;
    }

    debug!("Worker {} finished after {} paths", worker_id, handled);
}

fn inspect_path(path: &Path, store: &dyn CatalogStore, tag: &str, force: bool) -> WorkerReport {
    let absolute = match fs::canonicalize(path) {
        Ok(p) => p,
        Err(e) => {
            return WorkerReport::Failed {
                path: path.to_path_buf(),
                error: FsakError::path_io(path, e),
            }
        }
    };

    if !force {
        match store.get(&absolute) {
            Ok(Some(_)) => return WorkerReport::Known(absolute),
            Ok(None) => {}
            Err(error) => {
                return WorkerReport::Failed {
                    path: absolute,
                    error,
                }
            }
        }
    }

    match CatalogEntry::from_path(&absolute, tag) {
        Ok(entry) => WorkerReport::Entry(entry),
        Err(error) => WorkerReport::Failed {
            path: absolute,
            error,
        },
    }
}

fn map_join_error(error: tokio::task::JoinError) -> FsakError {
    FsakError::Io(std::io::Error::other(format!(
        "sync pipeline task failed: {}",
        error
    )))
}
