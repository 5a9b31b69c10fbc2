//! Progress reporting

use crate::pipeline::{SyncEvent, SyncSummary};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};

/// Progress reporter for catalog operations
pub struct ProgressReporter {
    scan_bar: ProgressBar,
    work_bar: ProgressBar,
    work_started_at: Option<Instant>,
    transferred_bytes: u64,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let scan_bar = ProgressBar::new_spinner();
        scan_bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            scan_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }

        let work_bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {msg}") {
            work_bar.set_style(style.progress_chars("=>-"));
        }

        Self {
            scan_bar,
            work_bar,
            work_started_at: None,
            transferred_bytes: 0,
        }
    }

    /// Mark start of a scanning phase.
    pub fn start_scan(&self, label: &str) {
        self.scan_bar.set_message(format!("Scanning {}...", label));
    }

    /// Update scanning progress counters.
    pub fn update_scan(&self, label: &str, files: usize, cached: usize) {
        self.scan_bar.set_message(format!(
            "Scanning {}... {} files ({} from catalog)",
            label, files, cached
        ));
    }

    /// Mark completion of a scanning phase.
    pub fn finish_scan(&self, label: &str, files: usize) {
        self.scan_bar
            .finish_with_message(format!("Scanned {}: {} files", label, files));
    }

    /// Initialize a counted work phase.
    pub fn start_work(&mut self, total: u64) {
        self.work_started_at = Some(Instant::now());
        self.transferred_bytes = 0;
        self.work_bar.set_length(total);
        self.work_bar.set_position(0);
        self.work_bar.set_message("Starting...".to_string());
    }

    /// Drive the bar from sync pipeline events.
    pub fn on_sync_event(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::Counted { total } => {
                self.finish_scan("roots", *total);
                self.start_work(*total as u64);
            }
            SyncEvent::Committed {
                processed,
                total,
                percent,
                path,
            } => {
                self.work_bar.set_position(*processed as u64);
                self.work_bar
                    .set_message(format_committed(*processed, *total, *percent, path));
            }
            SyncEvent::Failed { path, error } => self.report_error("Skipped", path, error),
            SyncEvent::Complete { summary } => self.finish_sync(summary),
        }
    }

    /// Mark one copied file complete and refresh throughput display.
    pub fn complete_transfer_file(&mut self, path: &Path, bytes: u64) {
        self.transferred_bytes = self.transferred_bytes.saturating_add(bytes);
        self.work_bar.inc(1);
        self.work_bar.set_message(format!(
            "{} | {} copied | {}/s",
            path.display(),
            HumanBytes(self.transferred_bytes),
            HumanBytes(self.current_throughput_bps())
        ));
    }

    /// Advance the bar by one step with a message.
    pub fn step(&self, message: String) {
        self.work_bar.inc(1);
        self.work_bar.set_message(message);
    }

    /// Print a per-file error above the bar.
    pub fn report_error(&self, action: &str, path: &Path, err: &str) {
        self.work_bar
            .println(format!("WARN {} {}: {}", action, path.display(), err));
    }

    /// Finish a counted phase with a summary line.
    pub fn finish_work(&self, message: String) {
        self.work_bar.finish_with_message(message);
    }

    fn finish_sync(&self, summary: &SyncSummary) {
        self.finish_work(format!(
            "Sync complete: {} committed, {} already catalogued, {} failed | {} of {} files in {} batches",
            summary.committed,
            summary.skipped,
            summary.failed,
            summary.committed + summary.skipped + summary.failed,
            summary.total,
            summary.batches
        ));
    }

    fn current_throughput_bps(&self) -> u64 {
        match self.work_started_at {
            Some(started) => {
                let secs = started.elapsed().as_secs_f64();
                if secs > 0.0 {
                    (self.transferred_bytes as f64 / secs) as u64
                } else {
                    0
                }
            }
            None => 0,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// `[ 3 / 10 (30.00%)] /data/a.jpg`
pub fn format_committed(processed: usize, total: usize, percent: f64, path: &Path) -> String {
    format!(
        "[ {} / {} ({:.2}%)] {}",
        processed,
        total,
        percent,
        path.display()
    )
}
