//! Dump coordinator for orchestrating dump runs
//!
//! The coordinator pulls results from a page stream one at a time, numbers each
//! page in arrival order and hands it to a write task without waiting for the
//! write to finish. Once the stream closes it waits for every write and folds
//! the outcomes into a [`DumpSummary`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DumpConfig;
use crate::error::{exit_code, Result};
use crate::source::{PageResult, PageSource};

use super::directory::DumpDirectory;
use super::naming::{FileIndex, NamePattern};
use super::progress::ProgressTracker;
use super::tracker::WriteTracker;
use super::writer::{PageSink, PageWriter};

/// Consumer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Pulling results from the stream
    Draining,
    /// Stream closed, waiting for outstanding writes
    Finishing,
    /// Every write has completed
    Done,
}

/// Result of a dump run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    /// Directory holding the page files
    pub directory: PathBuf,
    /// Pages received (and numbered)
    pub pages: u64,
    /// Documents received
    pub documents: u64,
    /// Error results received from the stream
    pub stream_errors: u64,
    /// Page files written successfully
    pub written_files: usize,
    /// Documents in those files
    pub documents_written: u64,
    /// Bytes written
    pub bytes_written: u64,
    /// Page files that failed to write, where known
    pub failed_files: Vec<PathBuf>,
    /// Number of failed writes
    pub failed_writes: usize,
    /// Whether draining stopped on cancellation
    pub interrupted: bool,
    /// Time taken for the run
    pub elapsed_ms: u64,
}

impl DumpSummary {
    pub fn is_success(&self) -> bool {
        self.exit_code() == exit_code::SUCCESS
    }

    /// Process exit status for this run
    ///
    /// Only write failures and interruption affect the status. Error results
    /// from the stream are logged and counted but leave the status alone.
    pub fn exit_code(&self) -> i32 {
        if self.failed_writes > 0 {
            exit_code::WRITE
        } else if self.interrupted {
            exit_code::INTERRUPTED
        } else {
            exit_code::SUCCESS
        }
    }
}

/// Coordinator for dump operations
pub struct DumpCoordinator {
    /// Where page files go
    directory: DumpDirectory,
    /// Writes one page to one file
    sink: Arc<dyn PageSink>,
    /// Progress tracker for user feedback
    tracker: ProgressTracker,
    /// Cancellation token for stopping the drain
    cancel_token: Option<CancellationToken>,
    /// Current consumer state
    state: ConsumerState,
}

impl DumpCoordinator {
    /// Create a new dump coordinator
    pub fn new(directory: DumpDirectory, sink: Arc<dyn PageSink>, tracker: ProgressTracker) -> Self {
        Self {
            directory,
            sink,
            tracker,
            cancel_token: None,
            state: ConsumerState::Draining,
        }
    }

    /// Set cancellation token for this dump
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    fn transition(&mut self, next: ConsumerState) {
        debug!("Consumer state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Drain `results` and wait for every write
    ///
    /// # Returns
    /// * `DumpSummary` - Counts, failures and the aggregate exit status
    pub async fn execute<S>(&mut self, mut results: S) -> DumpSummary
    where
        S: Stream<Item = PageResult> + Send + Unpin,
    {
        let start_time = Instant::now();
        let mut writes = WriteTracker::new();
        let mut next_index = FileIndex::FIRST;
        let mut summary = DumpSummary {
            directory: self.directory.path().to_path_buf(),
            ..DumpSummary::default()
        };

        info!("Starting dump into {}", self.directory.path().display());

        while self.state == ConsumerState::Draining {
            let next = match &self.cancel_token {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        info!("Dump cancelled, no further pages will be requested");
                        summary.interrupted = true;
                        None
                    }
                    next = results.next() => next,
                },
                None => results.next().await,
            };

            match next {
                Some(PageResult::Page(page)) => {
                    let index = next_index;
                    next_index = index.next();

                    let path = self.directory.file_path(index);
                    summary.pages += 1;
                    summary.documents += page.len() as u64;
                    debug!(
                        "Page {} with {} documents -> {}",
                        index,
                        page.len(),
                        path.display()
                    );

                    let sink = Arc::clone(&self.sink);
                    let target = path.clone();
                    writes.spawn(path, async move { sink.write_page(page, &target).await });

                    writes.reap_finished();
                    self.tracker.update(summary.pages, summary.documents);
                }
                Some(PageResult::Error(e)) => {
                    summary.stream_errors += 1;
                    warn!("Query error: {}", e);
                }
                None => self.transition(ConsumerState::Finishing),
            }
        }

        // Closing the stream lets the producer stop.
        drop(results);

        self.tracker
            .set_status(&format!("waiting for {} writes", writes.outstanding()));
        let report = writes.wait_all().await;
        self.transition(ConsumerState::Done);
        self.tracker.finish();

        summary.written_files = report.written;
        summary.documents_written = report.documents;
        summary.bytes_written = report.bytes;
        summary.failed_writes = report.failed;
        summary.failed_files = report.failed_files;
        summary.elapsed_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Dump completed: {} pages, {} documents received, {} files with {} documents, {} bytes, {} ms",
            summary.pages,
            summary.documents,
            summary.written_files,
            summary.documents_written,
            summary.bytes_written,
            summary.elapsed_ms
        );
        if summary.stream_errors > 0 {
            warn!("{} query errors were reported", summary.stream_errors);
        }
        if summary.failed_writes > 0 {
            error!("{} page files failed to write", summary.failed_writes);
            for path in &summary.failed_files {
                error!("  failed: {}", path.display());
            }
        }

        summary
    }
}

/// Run a complete dump: set up the source, create the directory, drain
///
/// # Arguments
/// * `config` - Run configuration
/// * `source` - Producer of pages
/// * `cancel_token` - Stops draining when cancelled
///
/// # Returns
/// * `Result<DumpSummary>` - Summary, or a fatal pre-stream error
pub async fn run_dump(
    config: &DumpConfig,
    mut source: Box<dyn PageSource>,
    cancel_token: Option<CancellationToken>,
) -> Result<DumpSummary> {
    source.prepare().await?;

    let pattern = NamePattern::derive(&config.endpoint);
    let directory = DumpDirectory::create(&config.destination, &pattern, config.dir_mode).await?;

    let sink: Arc<dyn PageSink> = Arc::new(PageWriter::new(config.strip_reserved()));
    let tracker = ProgressTracker::new(config.show_progress);

    let mut coordinator = DumpCoordinator::new(directory, sink, tracker);
    if let Some(token) = cancel_token {
        coordinator = coordinator.with_cancellation(token);
    }

    Ok(coordinator.execute(source.into_stream()).await)
}
