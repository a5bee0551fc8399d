use std::path::PathBuf;
use std::{fmt, io};

/// Crate-wide `Result` type using [`DumpError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DumpError>;

/// Process exit codes, one per failure class.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const DIRECTORY: i32 = 2;
    pub const QUERY: i32 = 3;
    pub const WRITE: i32 = 10;
    pub const ARGUMENTS: i32 = 11;
    pub const INTERRUPTED: i32 = 130;
}

/// Top-level error type for solrdump operations.
///
/// Wraps the more specific error kinds so a single type can travel through
/// the crate and be turned into an exit status at the very end.
#[derive(Debug)]
pub enum DumpError {
    /// Argument or configuration errors.
    Config(ConfigError),

    /// Collection link could not be turned into an endpoint.
    Endpoint(EndpointError),

    /// Query could not be set up against the service.
    Query(QueryError),

    /// Dump directory could not be created.
    Directory(DirectoryError),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(PathBuf),

    /// Config file exists but could not be read.
    Unreadable { path: PathBuf, source: io::Error },

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Collection link errors, one per way the link can be malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The link is not a URL at all.
    Unparseable { link: String, reason: String },

    /// Scheme is neither http nor https.
    UnsupportedScheme(String),

    /// No host in the link.
    MissingHost,

    /// Path does not start with `/solr/`.
    MissingSolrSegment,

    /// Path stops at `/solr/`.
    MissingCollection,

    /// Collection segment contains characters Solr does not allow.
    InvalidCollectionName(String),

    /// Extra segments after the collection name.
    UnexpectedPath(String),
}

/// Query setup errors. All of them are fatal before the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Sort specification could not be parsed.
    InvalidSort(String),

    /// Sort specification does not reference the collection's unique key.
    SortMissingUniqueKey { sort: String, unique_key: String },

    /// The service rejected or could not answer the setup request.
    Setup(String),
}

/// Errors carried by a stream result in place of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Request could not be sent or the response body not read.
    Transport(String),

    /// Service answered with a non-success status.
    HttpStatus { status: u16, body: String },

    /// Service answered with an error payload.
    Service { code: Option<i64>, message: String },

    /// Response body is not the expected JSON shape.
    Decode(String),
}

/// Dump directory errors.
#[derive(Debug)]
pub enum DirectoryError {
    /// Directory (or a parent) could not be created.
    CreationFailed { path: PathBuf, source: io::Error },

    /// Path already exists and is not a directory.
    NotADirectory(PathBuf),
}

/// Failure to produce one page file. Scoped to that one file.
#[derive(Debug)]
pub enum WriteError {
    /// File could not be created or truncated.
    Create { path: PathBuf, source: io::Error },

    /// A document could not be encoded.
    Encode { path: PathBuf, source: serde_json::Error },

    /// Bytes could not be written or flushed.
    Io { path: PathBuf, source: io::Error },

    /// The write task did not run to completion.
    Aborted { path: PathBuf, reason: String },
}

impl DumpError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DumpError::Config(_) | DumpError::Endpoint(_) => exit_code::ARGUMENTS,
            DumpError::Query(_) => exit_code::QUERY,
            DumpError::Directory(_) => exit_code::DIRECTORY,
        }
    }
}

impl WriteError {
    /// Path of the file the failed write targeted.
    pub fn path(&self) -> &PathBuf {
        match self {
            WriteError::Create { path, .. }
            | WriteError::Encode { path, .. }
            | WriteError::Io { path, .. }
            | WriteError::Aborted { path, .. } => path,
        }
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Config(e) => write!(f, "Configuration error: {e}"),
            DumpError::Endpoint(e) => write!(f, "Wrong link to a Solr collection: {e}"),
            DumpError::Query(e) => write!(f, "Wrong query: {e}"),
            DumpError::Directory(e) => write!(f, "Output error: {e}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            ConfigError::Unreadable { path, source } => {
                write!(f, "Cannot read config file {}: {source}", path.display())
            }
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointError::Unparseable { link, reason } => {
                write!(f, "cannot parse \"{link}\": {reason}")
            }
            EndpointError::UnsupportedScheme(scheme) => {
                write!(f, "unsupported scheme \"{scheme}\", expected http or https")
            }
            EndpointError::MissingHost => write!(f, "missing host"),
            EndpointError::MissingSolrSegment => write!(f, "path must start with /solr/"),
            EndpointError::MissingCollection => write!(f, "missing collection name after /solr/"),
            EndpointError::InvalidCollectionName(name) => {
                write!(f, "invalid collection name \"{name}\"")
            }
            EndpointError::UnexpectedPath(rest) => {
                write!(f, "unexpected path after collection name: \"{rest}\"")
            }
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidSort(msg) => write!(f, "invalid sort: {msg}"),
            QueryError::SortMissingUniqueKey { sort, unique_key } => write!(
                f,
                "sort \"{sort}\" must include the unique key field \"{unique_key}\""
            ),
            QueryError::Setup(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport(msg) => write!(f, "transport error: {msg}"),
            SourceError::HttpStatus { status, body } => {
                write!(f, "HTTP status {status}: {body}")
            }
            SourceError::Service { code, message } => match code {
                Some(code) => write!(f, "Solr error {code}: {message}"),
                None => write!(f, "Solr error: {message}"),
            },
            SourceError::Decode(msg) => write!(f, "cannot decode response: {msg}"),
        }
    }
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::CreationFailed { path, source } => {
                write!(f, "cannot create directory {}: {source}", path.display())
            }
            DirectoryError::NotADirectory(path) => {
                write!(f, "{} exists and is not a directory", path.display())
            }
        }
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Create { path, source } => {
                write!(f, "error of creating the file {}: {source}", path.display())
            }
            WriteError::Encode { path, source } => {
                write!(f, "error of document processing for {}: {source}", path.display())
            }
            WriteError::Io { path, source } => {
                write!(f, "error of writing to {}: {source}", path.display())
            }
            WriteError::Aborted { path, reason } => {
                write!(f, "write task for {} did not finish: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for DumpError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for EndpointError {}
impl std::error::Error for QueryError {}
impl std::error::Error for SourceError {}
impl std::error::Error for DirectoryError {}
impl std::error::Error for WriteError {}

/* ========================= Conversions to DumpError ========================= */

impl From<ConfigError> for DumpError {
    fn from(err: ConfigError) -> Self {
        DumpError::Config(err)
    }
}

impl From<EndpointError> for DumpError {
    fn from(err: EndpointError) -> Self {
        DumpError::Endpoint(err)
    }
}

impl From<QueryError> for DumpError {
    fn from(err: QueryError) -> Self {
        DumpError::Query(err)
    }
}

impl From<DirectoryError> for DumpError {
    fn from(err: DirectoryError) -> Self {
        DumpError::Directory(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_class() {
        let endpoint: DumpError = EndpointError::MissingHost.into();
        let query: DumpError = QueryError::InvalidSort("x".into()).into();
        let dir: DumpError = DirectoryError::NotADirectory(PathBuf::from("/tmp/x")).into();
        let config: DumpError = ConfigError::Unreadable {
            path: PathBuf::from("/etc/solrdump.toml"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        }
        .into();

        assert_eq!(endpoint.exit_code(), exit_code::ARGUMENTS);
        assert_eq!(config.exit_code(), exit_code::ARGUMENTS);
        assert_eq!(query.exit_code(), exit_code::QUERY);
        assert_eq!(dir.exit_code(), exit_code::DIRECTORY);
    }

    #[test]
    fn test_write_error_path() {
        let err = WriteError::Create {
            path: PathBuf::from("/x/y.json"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.path(), &PathBuf::from("/x/y.json"));
        assert!(err.to_string().contains("/x/y.json"));
    }
}
