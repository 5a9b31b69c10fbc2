//! Single-writer collector for the sync pipeline

use super::{SyncCallback, SyncEvent, SyncSummary, WorkerReport};
use crate::catalog::CatalogStore;
use crate::types::{CatalogEntry, FsakError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Owns the batch buffer and every counter of a run
pub(super) struct Collector<'a> {
    store: Arc<dyn CatalogStore>,
    batch: Vec<CatalogEntry>,
    batch_size: usize,
    summary: SyncSummary,
    on_event: Option<&'a SyncCallback<'a>>,
}

impl<'a> Collector<'a> {
    pub(super) fn new(
        store: Arc<dyn CatalogStore>,
        batch_size: usize,
        total: usize,
        on_event: Option<&'a SyncCallback<'a>>,
    ) -> Self {
        Self {
            store,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            summary: SyncSummary {
                total,
                ..SyncSummary::default()
            },
            on_event,
        }
    }

    /// Drain reports until every worker is gone, then flush the tail
    ///
    /// Returns early on a store failure; dropping the receiver makes the
    /// workers stop at their next send.
    pub(super) async fn run(
        mut self,
        mut reports: mpsc::Receiver<WorkerReport>,
    ) -> Result<SyncSummary, FsakError> {
        while let Some(report) = reports.recv().await {
            match report {
                WorkerReport::Entry(entry) => {
                    self.batch.push(entry);
                    if self.batch.len() >= self.batch_size {
                        self.flush()?;
                    }
                }
                WorkerReport::Known(path) => {
                    self.summary.skipped += 1;
                    debug!("Already catalogued, skipping {}", path.display());
                }
                WorkerReport::Failed { path, error } => {
                    if error.is_fatal() {
                        return Err(error);
                    }
                    self.summary.failed += 1;
                    warn!("Skipping {}: {}", path.display(), error);
                    self.emit(&SyncEvent::Failed {
                        path,
                        error: error.to_string(),
                    });
                }
            }
        }

        self.flush()?;
        self.emit(&SyncEvent::Complete {
            summary: self.summary.clone(),
        });
        Ok(self.summary)
    }

    fn flush(&mut self) -> Result<(), FsakError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        self.store.upsert_batch(&self.batch)?;
        self.summary.batches += 1;
        debug!("Committed batch of {} entries", self.batch.len());

        let batch = std::mem::take(&mut self.batch);
        for entry in batch {
            self.summary.committed += 1;
            let event = SyncEvent::Committed {
                processed: self.summary.committed,
                total: self.summary.total,
                percent: percent_of(self.summary.committed, self.summary.total),
                path: entry.path,
            };
            self.emit(&event);
        }
        self.batch.reserve(self.batch_size);
        Ok(())
    }

    fn emit(&self, event: &SyncEvent) {
        if let Some(callback) = self.on_event {
            callback(event);
        }
    }
}

fn percent_of(done: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        done as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn entries(dir: &TempDir, count: usize) -> Vec<CatalogEntry> {
        (0..count)
            .map(|i| {
                let path = dir.path().join(format!("f{i}.txt"));
                fs::write(&path, format!("content {i}")).expect("write file");
                CatalogEntry::from_path(&path, "t").expect("entry")
            })
            .collect()
    }

    struct FailingStore;

    impl CatalogStore for FailingStore {
        fn get(&self, _: &std::path::Path) -> Result<Option<CatalogEntry>, FsakError> {
            Ok(None)
        }
        fn upsert(&self, _: &CatalogEntry) -> Result<(), FsakError> {
            Err(FsakError::Store("disk full".to_string()))
        }
        fn upsert_batch(&self, _: &[CatalogEntry]) -> Result<(), FsakError> {
            Err(FsakError::Store("disk full".to_string()))
        }
        fn delete(&self, _: &str) -> Result<bool, FsakError> {
            Ok(false)
        }
        fn all(&self) -> Result<Vec<CatalogEntry>, FsakError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_batches_and_final_partial_flush() {
        let temp = TempDir::new().expect("create temp dir");
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryCatalog::new());
        let (tx, rx) = mpsc::channel(16);

        for entry in entries(&temp, 5) {
            tx.send(WorkerReport::Entry(entry)).await.expect("send");
        }
        drop(tx);

        let summary = Collector::new(Arc::clone(&store), 2, 5, None)
            .run(rx)
            .await
            .expect("collector run");

        assert_eq!(summary.committed, 5);
        assert_eq!(summary.batches, 3);
        assert_eq!(store.count().expect("count"), 5);
    }

    #[tokio::test]
    async fn test_progress_is_reported_in_commit_order() {
        let temp = TempDir::new().expect("create temp dir");
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryCatalog::new());
        let (tx, rx) = mpsc::channel(16);
        let sent = entries(&temp, 3);
        for entry in sent.clone() {
            tx.send(WorkerReport::Entry(entry)).await.expect("send");
        }
        tx.send(WorkerReport::Known(PathBuf::from("/known")))
            .await
            .expect("send");
        drop(tx);

        let seen = Mutex::new(Vec::new());
        let callback = |event: &SyncEvent| {
            if let SyncEvent::Committed {
                processed,
                total,
                percent,
                path,
            } = event
            {
                seen.lock()
                    .unwrap()
                    .push((*processed, *total, *percent, path.clone()));
            }
        };

        let summary = Collector::new(store, 10, 4, Some(&callback))
            .run(rx)
            .await
            .expect("collector run");

        let seen = seen.into_inner().unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, 1);
        assert_eq!(seen[2].0, 3);
        assert_eq!(seen[1].1, 4);
        assert!((seen[1].2 - 50.0).abs() < f64::EPSILON);
        let paths: Vec<_> = sent.into_iter().map(|e| e.path).collect();
        assert_eq!(seen.iter().map(|s| s.3.clone()).collect::<Vec<_>>(), paths);
    }

    #[tokio::test]
    async fn test_per_file_failures_are_counted_not_fatal() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryCatalog::new());
        let (tx, rx) = mpsc::channel(4);
        tx.send(WorkerReport::Failed {
            path: PathBuf::from("/locked"),
            error: FsakError::path_io(
                std::path::Path::new("/locked"),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ),
        })
        .await
        .expect("send");
        drop(tx);

        let summary = Collector::new(store, 10, 1, None)
            .run(rx)
            .await
            .expect("collector run");
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.committed, 0);
    }

    #[tokio::test]
    async fn test_store_failure_aborts_run() {
        let temp = TempDir::new().expect("create temp dir");
        let (tx, rx) = mpsc::channel(4);
        for entry in entries(&temp, 1) {
            tx.send(WorkerReport::Entry(entry)).await.expect("send");
        }
        drop(tx);

        let err = Collector::new(Arc::new(FailingStore), 1, 1, None)
            .run(rx)
            .await
            .expect_err("store failure must abort");
        assert!(matches!(err, FsakError::Store(_)));
    }

    #[test]
    fn test_percent_of_empty_total() {
        assert_eq!(percent_of(0, 0), 100.0);
        assert_eq!(percent_of(1, 4), 25.0);
    }
}
