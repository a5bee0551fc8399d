//! Configuration management for solrdump
//!
//! Two layers live here:
//! - [`Config`]: the optional TOML file with defaults and logging settings
//! - [`DumpConfig`]: the immutable value describing one run, built once from
//!   the command line on top of [`Config`] and passed to every component
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables (credentials only)
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::connection::Endpoint;
use crate::error::{ConfigError, Result};
use crate::source::QuerySpec;

/// Main configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Defaults for dump parameters
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults applied when the matching flag is not given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Query predicate
    #[serde(default = "default_query")]
    pub query: String,

    /// Documents requested per page, and so per file
    #[serde(default = "default_rows")]
    pub rows: u32,

    /// HTTP timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    /// Octal permissions for the dump directory
    #[serde(default = "default_dir_perms")]
    pub dir_perms: String,

    /// Where the dump directory is created
    #[serde(default = "default_destination")]
    pub destination: PathBuf,

    /// Pages the fetcher may run ahead of the writer dispatch
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_query() -> String {
    "*:*".to_string()
}

fn default_rows() -> u32 {
    100_000
}

fn default_http_timeout() -> u64 {
    180
}

fn default_dir_perms() -> String {
    "0755".to_string()
}

fn default_destination() -> PathBuf {
    PathBuf::from(".")
}

fn default_channel_capacity() -> usize {
    2
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            rows: default_rows(),
            http_timeout: default_http_timeout(),
            dir_perms: default_dir_perms(),
            destination: default_destination(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// An explicit path must exist. Without one, the default path is tried
    /// and a missing file yields the built-in defaults.
    ///
    /// # Arguments
    /// * `path` - Explicit configuration file, if any
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound(path).into());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Unreadable { path, source })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".solrdump")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        let d = &self.defaults;
        if d.rows == 0 {
            return Err(invalid("defaults.rows", d.rows).into());
        }
        if d.http_timeout == 0 {
            return Err(invalid("defaults.http_timeout", d.http_timeout).into());
        }
        if d.channel_capacity == 0 {
            return Err(invalid("defaults.channel_capacity", d.channel_capacity).into());
        }
        parse_dir_perms(&d.dir_perms)?;
        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn invalid(field: &str, value: impl fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Parse an octal permission string like `0755`
pub fn parse_dir_perms(perms: &str) -> std::result::Result<u32, ConfigError> {
    let trimmed = perms.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if !digits.is_empty() && mode <= 0o7777 => Ok(mode),
        _ => Err(invalid("perms", perms)),
    }
}

/// Basic-auth credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Everything one dump run needs, fixed before the run starts
#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// Collection to dump
    pub endpoint: Endpoint,

    /// Query parameters
    pub query: QuerySpec,

    /// Optional basic-auth credentials
    pub credentials: Option<Credentials>,

    /// Per-request HTTP timeout
    pub http_timeout: Duration,

    /// Directory under which the dump directory is created
    pub destination: PathBuf,

    /// Unix mode bits for the dump directory
    pub dir_mode: u32,

    /// Pages the fetcher may run ahead of dispatch
    pub channel_capacity: usize,

    /// Show a progress spinner on stderr
    pub show_progress: bool,
}

impl DumpConfig {
    /// Whether the reserved field is stripped from every document
    pub fn strip_reserved(&self) -> bool {
        self.query.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.defaults.query, "*:*");
        assert_eq!(config.defaults.rows, 100_000);
        assert_eq!(config.defaults.http_timeout, 180);
        assert_eq!(config.defaults.dir_perms, "0755");
        assert_eq!(config.defaults.destination, PathBuf::from("."));
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [defaults]
            rows = 500

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.defaults.rows, 500);
        assert_eq!(config.defaults.http_timeout, 180);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.timestamps);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[defaults]\nrows = \"many\"").unwrap_err();
        assert!(matches!(
            err,
            crate::error::DumpError::Config(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_unreadable_config_is_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from_file(Some(dir.path())).unwrap_err();
        assert!(matches!(
            err,
            crate::error::DumpError::Config(ConfigError::Unreadable { .. })
        ));
        assert_eq!(err.exit_code(), crate::error::exit_code::ARGUMENTS);
    }

    #[test]
    fn test_validate_rejects_zero_rows() {
        let mut config = Config::default();
        config.defaults.rows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load_from_file(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\ndir_perms = \"0700\"\n").unwrap();
        let config = Config::load_from_file(Some(&path)).unwrap();
        assert_eq!(config.defaults.dir_perms, "0700");
    }

    #[test]
    fn test_parse_dir_perms() {
        assert_eq!(parse_dir_perms("0755").unwrap(), 0o755);
        assert_eq!(parse_dir_perms("700").unwrap(), 0o700);
        assert_eq!(parse_dir_perms("0o750").unwrap(), 0o750);
        assert!(parse_dir_perms("0855").is_err());
        assert!(parse_dir_perms("").is_err());
        assert!(parse_dir_perms("rwx").is_err());
        assert!(parse_dir_perms("177777").is_err());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            user: "admin".into(),
            password: Some("secret".into()),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("admin"));
        assert!(!shown.contains("secret"));
    }
}
