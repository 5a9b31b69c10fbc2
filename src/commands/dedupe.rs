//! `fsak clean dup`

use super::{catalog_skip, open_catalog};
use crate::catalog::ScanEvent;
use crate::config::{CleanDupArgs, FileConfig, Workspace};
use crate::dedupe::{find_duplicates, resolve_duplicates, DedupeSummary};
use crate::scanner::{canonical_roots, ExclusionRules};
use crate::types::FsakError;
use crate::ui::{ProgressReporter, Selector};
use indicatif::HumanBytes;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn run(
    args: &CleanDupArgs,
    workspace: &Workspace,
    config: &FileConfig,
    selector: &mut dyn Selector,
) -> Result<DedupeSummary, FsakError> {
    let roots = canonical_roots(&args.dirs)?;
    let blacklist = config.blacklist(args.blacklist.as_deref());
    let rules = ExclusionRules::load_optional(blacklist.as_deref())?;
    let deleted_dir = config.deleted_dir(args.deleted_dir.as_deref(), workspace);
    let store = open_catalog(workspace)?;

    let reporter = ProgressReporter::new();
    reporter.start_scan("for duplicates");
    let cached = AtomicUsize::new(0);
    let scan_cb = |event: &ScanEvent| {
        if let ScanEvent::Resolved { index, cached: hit, .. } = event {
            if *hit {
                cached.fetch_add(1, Ordering::Relaxed);
            }
            reporter.update_scan("for duplicates", *index, cached.load(Ordering::Relaxed));
        }
    };
    let scan = find_duplicates(
        &roots,
        &store,
        rules,
        &catalog_skip(workspace),
        Some(&scan_cb),
    )?;
    reporter.finish_scan("for duplicates", scan.scanned);

    if scan.groups.is_empty() {
        println!("No duplicate files found.");
        return Ok(DedupeSummary::default());
    }

    let redundant: u64 = scan.groups.iter().map(|g| g.redundant_bytes()).sum();
    println!(
        "Found {} duplicate group(s); {} could be freed. Chosen files are moved to {}",
        scan.groups.len(),
        HumanBytes(redundant),
        deleted_dir.display()
    );

    let summary = resolve_duplicates(&scan, &store, selector, &deleted_dir)?;
    println!(
        "Moved {} file(s) ({}), {} failed, {} catalog row(s) removed",
        summary.moved,
        HumanBytes(summary.bytes_moved),
        summary.failed,
        summary.rows_removed
    );
    Ok(summary)
}
