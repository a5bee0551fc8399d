//! Dump module for turning a page stream into numbered JSON files
//!
//! # Architecture
//!
//! 1. **NamePattern**: `<host>[.<port>].<collection>.` prefix shared by every name of a run
//! 2. **DumpDirectory**: the per-run directory, created once before any write
//! 3. **DumpCoordinator**: drains the stream, numbers pages, dispatches writes
//! 4. **PageWriter**: encodes one page as a JSON array file
//! 5. **WriteTracker**: owns the write tasks and aggregates their outcomes
//!
//! # Example
//!
//! ```no_run
//! // let source = Box::new(SolrCursorSource::new(&config)?);
//! // let summary = run_dump(&config, source, None).await?;
//! // std::process::exit(summary.exit_code());
//! ```

pub mod coordinator;
pub mod directory;
pub mod naming;
pub mod progress;
pub mod tracker;
pub mod writer;

pub use coordinator::{run_dump, ConsumerState, DumpCoordinator, DumpSummary};
pub use directory::DumpDirectory;
pub use naming::{FileIndex, NamePattern};
pub use progress::ProgressTracker;
pub use tracker::{WriteReport, WriteTracker};
pub use writer::{PageSink, PageWriter, WrittenFile, RESERVED_FIELD};
