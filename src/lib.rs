//! Solr Dump Library
//!
//! This library walks a Solr collection with cursor pagination and saves
//! every page of documents as its own JSON file inside a timestamped dump
//! directory. It can be used as a standalone library to build export tools.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: Collection link parsing and HTTP client setup
//! - `dump`: Page numbering, directory creation and concurrent file writes
//! - `error`: Error types and exit codes
//! - `source`: Page sources, including the Solr cursor producer
//!
//! # Example
//!
//! ```no_run
//! use solrdump::{run_dump, DumpConfig, SolrCursorSource};
//!
//! async fn dump(config: DumpConfig) -> solrdump::Result<i32> {
//!     let source = Box::new(SolrCursorSource::new(&config)?);
//!     let summary = run_dump(&config, source, None).await?;
//!     Ok(summary.exit_code())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod dump;
pub mod error;
pub mod source;

// Re-export commonly used types
pub use config::{Config, DumpConfig};
pub use connection::Endpoint;
pub use dump::{run_dump, DumpCoordinator, DumpSummary};
pub use error::{DumpError, Result};
pub use source::{Page, PageResult, PageSource, SolrCursorSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
