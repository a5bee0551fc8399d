//! File and directory naming for one dump run

use std::fmt;

use crate::connection::Endpoint;
use crate::error::EndpointError;

/// Sequential, arrival-ordered number of a page file, starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileIndex(u64);

impl FileIndex {
    pub const FIRST: FileIndex = FileIndex(1);

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> FileIndex {
        FileIndex(self.0 + 1)
    }
}

impl fmt::Display for FileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Filesystem-safe prefix shared by the dump directory and every page file
///
/// Format: `<host>[.<port>].<collection>.`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern(String);

impl NamePattern {
    /// Derive the pattern from a parsed endpoint
    pub fn derive(endpoint: &Endpoint) -> Self {
        let host = match endpoint.port {
            Some(port) => format!("{}.{}", endpoint.host, port),
            None => endpoint.host.clone(),
        };
        Self(format!("{}.{}.", host, endpoint.collection))
    }

    /// Parse a collection link and derive its pattern
    pub fn from_link(link: &str) -> Result<Self, EndpointError> {
        Endpoint::parse(link).map(|endpoint| Self::derive(&endpoint))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<pattern><index>.json`
    pub fn file_name(&self, index: FileIndex) -> String {
        format!("{}{}.json", self.0, index)
    }

    /// `<pattern><timestamp>`
    pub fn dir_name(&self, timestamp: &str) -> String {
        format!("{}{}", self.0, timestamp)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
