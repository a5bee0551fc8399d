//! Tracking of in-flight page writes
//!
//! Every write runs as its own task in a [`JoinSet`]. Outcomes flow back to
//! the single task that owns the tracker, so the aggregate needs no locking.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use futures::FutureExt;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error};

use crate::error::WriteError;

use super::writer::WrittenFile;

type WriteOutcome = Result<WrittenFile, WriteError>;

/// Aggregate of all finished writes
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteReport {
    /// Files written successfully
    pub written: usize,
    /// Documents in those files
    pub documents: u64,
    /// Bytes in those files
    pub bytes: u64,
    /// Number of writes that failed
    pub failed: usize,
    /// Target paths of failed writes, where known
    pub failed_files: Vec<PathBuf>,
}

impl WriteReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Owner of every dispatched write task
#[derive(Default)]
pub struct WriteTracker {
    tasks: JoinSet<WriteOutcome>,
    report: WriteReport,
}

impl WriteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a write task without waiting for it
    ///
    /// The task reports its own failure as soon as it happens. A panic inside
    /// the task is turned into a [`WriteError::Aborted`] for `path`.
    pub fn spawn<F>(&mut self, path: PathBuf, write: F)
    where
        F: Future<Output = WriteOutcome> + Send + 'static,
    {
        self.tasks.spawn(async move {
            let outcome = match AssertUnwindSafe(write).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => Err(WriteError::Aborted {
                    path,
                    reason: "write task panicked".to_string(),
                }),
            };
            if let Err(e) = &outcome {
                error!("{}", e);
            }
            outcome
        });
    }

    /// Number of writes not yet collected
    pub fn outstanding(&self) -> usize {
        self.tasks.len()
    }

    /// Collect writes that already finished, without waiting
    pub fn reap_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.record(joined);
        }
    }

    /// Wait for every outstanding write and return the aggregate
    pub async fn wait_all(mut self) -> WriteReport {
        debug!("Waiting for {} outstanding writes", self.tasks.len());
        while let Some(joined) = self.tasks.join_next().await {
            self.record(joined);
        }
        self.report
    }

    fn record(&mut self, joined: Result<WriteOutcome, JoinError>) {
        match joined {
            Ok(Ok(file)) => {
                self.report.written += 1;
                self.report.documents += file.documents as u64;
                self.report.bytes += file.bytes;
            }
            Ok(Err(e)) => {
                self.report.failed += 1;
                self.report.failed_files.push(e.path().clone());
            }
            Err(e) => {
                error!("Write task did not complete: {}", e);
                self.report.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    fn ok(path: &str, documents: usize) -> WriteOutcome {
        Ok(WrittenFile {
            path: PathBuf::from(path),
            documents,
            bytes: 10,
        })
    }

    #[tokio::test]
    async fn test_wait_all_aggregates() {
        let mut tracker = WriteTracker::new();
        tracker.spawn(PathBuf::from("1.json"), async { ok("1.json", 3) });
        tracker.spawn(PathBuf::from("2.json"), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ok("2.json", 4)
        });
        tracker.spawn(PathBuf::from("3.json"), async {
            Err(WriteError::Create {
                path: PathBuf::from("3.json"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            })
        });

        let report = tracker.wait_all().await;
        assert_eq!(report.written, 2);
        assert_eq!(report.documents, 7);
        assert_eq!(report.bytes, 20);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failed_files, vec![PathBuf::from("3.json")]);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_panicking_task_counts_as_failure() {
        let mut tracker = WriteTracker::new();
        tracker.spawn(PathBuf::from("boom.json"), async {
            if true {
                panic!("encoder exploded");
            }
            ok("boom.json", 0)
        });

        let report = tracker.wait_all().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.failed_files, vec![PathBuf::from("boom.json")]);
    }

    #[tokio::test]
    async fn test_reap_finished_does_not_wait() {
        let mut tracker = WriteTracker::new();
        tracker.spawn(PathBuf::from("slow.json"), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            ok("slow.json", 1)
        });

        tracker.reap_finished();
        assert_eq!(tracker.outstanding(), 1);
    }

    #[tokio::test]
    async fn test_empty_tracker_is_success() {
        let report = WriteTracker::new().wait_all().await;
        assert_eq!(report, WriteReport::default());
        assert!(report.is_success());
    }
}
