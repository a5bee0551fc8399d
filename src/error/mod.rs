//! Error handling for solrdump.
//!
//! Errors fall into three groups:
//! - fatal before the stream starts (endpoint, query setup, dump directory)
//! - per stream result ([`SourceError`]), reported and skipped
//! - per page write ([`WriteError`]), reported and folded into the final status

pub mod kinds;

pub use kinds::{
    exit_code, ConfigError, DirectoryError, DumpError, EndpointError, QueryError, Result,
    SourceError, WriteError,
};
