//! `fsak sync info`

use super::{catalog_skip, format_error_summary, open_catalog, ErrorRecord};
use crate::catalog::CatalogStore;
use crate::config::{FileConfig, SyncInfoArgs, Workspace};
use crate::pipeline::{run_sync, SyncEvent, SyncOptions, SyncSummary};
use crate::scanner::{canonical_roots, ExclusionRules};
use crate::types::FsakError;
use crate::ui::ProgressReporter;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Build run options from flags and the config file
///
/// Fails on a missing or non-directory root or an unreadable blacklist,
/// before the catalog is opened.
pub fn resolve_options(
    args: &SyncInfoArgs,
    workspace: &Workspace,
    config: &FileConfig,
) -> Result<SyncOptions, FsakError> {
    let blacklist = config.blacklist(args.blacklist.as_deref());
    let rules = ExclusionRules::load_optional(blacklist.as_deref())?;
    if !rules.is_empty() {
        info!("Loaded {} blacklist rule(s)", rules.len());
    }

    Ok(SyncOptions {
        workers: config.workers(args.threads),
        tag: config.tag(args.tag.as_deref()),
        force: args.force,
        batch_size: config.batch_size(args.batch),
        rules,
        skip_prefixes: catalog_skip(workspace),
    })
}

/// Run the sync operation
pub fn run(
    args: &SyncInfoArgs,
    workspace: &Workspace,
    config: &FileConfig,
) -> Result<SyncSummary, FsakError> {
    let roots = canonical_roots(&args.dirs)?;
    let options = resolve_options(args, workspace, config)?;
    let store: Arc<dyn CatalogStore> = Arc::new(open_catalog(workspace)?);

    info!(
        "Syncing {} root(s) with {} worker(s), batch size {}",
        roots.len(),
        options.workers,
        options.batch_size
    );

    let reporter = Mutex::new(ProgressReporter::new());
    if let Ok(progress) = reporter.lock() {
        progress.start_scan("roots");
    }
    let error_records: Mutex<Vec<ErrorRecord>> = Mutex::new(Vec::new());
    let progress_cb = |event: &SyncEvent| {
        if let SyncEvent::Failed { path, error } = event {
            if let Ok(mut records) = error_records.lock() {
                records.push(ErrorRecord::new(path, error));
            }
        }
        if let Ok(mut progress) = reporter.lock() {
            progress.on_sync_event(event);
        }
    };

    let summary = run_sync(&roots, &options, store, Some(&progress_cb))?;

    if let Ok(records) = error_records.lock() {
        if !records.is_empty() {
            println!("{}", format_error_summary(&records));
        }
    }
    println!(
        "Processed {} files: {} catalogued, {} already known, {} skipped",
        summary.total, summary.committed, summary.skipped, summary.failed
    );
    Ok(summary)
}
