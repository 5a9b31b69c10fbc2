//! `fsak merge dir`

use super::{catalog_skip, open_catalog};
use crate::catalog::ScanEvent;
use crate::config::{MergeDirArgs, Workspace};
use crate::merge::{execute_merge, plan_merge, MergeEvent, MergeSummary};
use crate::types::FsakError;
use crate::ui::ProgressReporter;
use indicatif::HumanBytes;
use std::sync::Mutex;

pub fn run(args: &MergeDirArgs, workspace: &Workspace) -> Result<MergeSummary, FsakError> {
    let store = open_catalog(workspace)?;

    let reporter = Mutex::new(ProgressReporter::new());
    if let Ok(progress) = reporter.lock() {
        progress.start_scan("source and target");
    }
    let scan_cb = |event: &ScanEvent| {
        if let ScanEvent::Resolved { index, .. } = event {
            if let Ok(progress) = reporter.lock() {
                progress.update_scan("source and target", *index, 0);
            }
        }
    };
    let plan = plan_merge(
        &args.from,
        &args.to,
        &store,
        &catalog_skip(workspace),
        Some(&scan_cb),
    )?;
    if let Ok(progress) = reporter.lock() {
        progress.finish_scan("source and target", plan.source_files + plan.target_files);
    }

    println!(
        "Source: {} files, target: {} files, {} not present in target",
        plan.source_files,
        plan.target_files,
        plan.novel.len()
    );
    if plan.skipped > 0 {
        println!("{} unreadable file(s) were left out of the comparison", plan.skipped);
    }
    if plan.novel.is_empty() {
        println!("Nothing to merge.");
        return Ok(MergeSummary::default());
    }
    println!("Copying into {}", plan.backup_dir.display());

    if let Ok(mut progress) = reporter.lock() {
        progress.start_work(plan.novel.len() as u64);
    }
    let copy_cb = |event: &MergeEvent| {
        if let Ok(mut progress) = reporter.lock() {
            match event {
                MergeEvent::Copied { from, bytes, .. } => {
                    progress.complete_transfer_file(from, *bytes)
                }
                MergeEvent::Complete { summary } => progress.finish_work(format!(
                    "Merged {} file(s), {}",
                    summary.copied,
                    HumanBytes(summary.bytes)
                )),
            }
        }
    };

    execute_merge(&plan, &store, Some(&copy_cb))
}
