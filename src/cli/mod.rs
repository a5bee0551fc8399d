//! Command-line interface for solrdump
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration file loading and merging with arguments
//! - Credential fallback to environment variables
//! - Shell completion generation

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{parse_dir_perms, Config, Credentials, DumpConfig, LogLevel};
use crate::connection::Endpoint;
use crate::error::{exit_code, ConfigError, Result};
use crate::source::query::parse_field_list;
use crate::source::{QuerySpec, SortSpec};

/// Environment variable holding the user name
pub const USER_ENV: &str = "SOLRUSER";

/// Environment variable holding the password
pub const PASSWORD_ENV: &str = "SOLRPASSW";

/// Dump documents from a Solr collection into JSON files
#[derive(Parser, Debug)]
#[command(
    name = "solrdump",
    version,
    about = "Dumps and saves documents from a Solr collection in JSON format",
    long_about = "Walks a Solr collection with cursor pagination and saves every page of
documents as its own JSON file inside a new, timestamped dump directory."
)]
pub struct CliArgs {
    /// Link to a Solr collection
    ///
    /// Format: http[s]://address[:port]/solr/collection
    #[arg(
        short = 'c',
        long = "colllink",
        value_name = "LINK",
        required_unless_present = "generate_completion"
    )]
    pub colllink: Option<String>,

    /// Query predicate (default: *:*)
    #[arg(short = 'q', long, value_name = "QUERY")]
    pub query: Option<String>,

    /// Field list. All fields of documents are exported by default
    #[arg(short = 'f', long = "fieldlist", value_name = "FIELDS", default_value = "")]
    pub fieldlist: String,

    /// Sort field with asc|desc; must include the unique key
    #[arg(
        short = 's',
        long,
        value_name = "SORT",
        required_unless_present = "generate_completion"
    )]
    pub sort: Option<String>,

    /// Documents requested by one query and saved in one file (default: 100000)
    #[arg(short = 'r', long, value_name = "ROWS")]
    pub rows: Option<u32>,

    /// Path to place the dump directory (default: .)
    #[arg(short = 'd', long = "dst", value_name = "DIR")]
    pub dst: Option<PathBuf>,

    /// User name
    #[arg(short = 'u', long, value_name = "USER", env = USER_ENV)]
    pub user: Option<String>,

    /// User password
    #[arg(
        short = 'p',
        long,
        value_name = "PASSWORD",
        env = PASSWORD_ENV,
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// HTTP timeout in seconds (default: 180)
    #[arg(
        short = 't',
        long = "http-timeout",
        visible_alias = "httpTimeout",
        value_name = "SECONDS"
    )]
    pub http_timeout: Option<u64>,

    /// Permissions for the dump directory (default: 0755)
    #[arg(short = 'm', long, value_name = "PERMS")]
    pub perms: Option<String>,

    /// Configuration file path
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Do not show the progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// Quiet mode (errors only)
    #[arg(long)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_name = "SHELL", exclusive = true)]
    pub generate_completion: Option<Shell>,
}

impl CliArgs {
    /// Parse process arguments, exiting with the argument failure code on error
    pub fn parse_or_exit() -> Self {
        match Self::try_parse() {
            Ok(args) => args,
            Err(e) => {
                let code = if e.use_stderr() {
                    exit_code::ARGUMENTS
                } else {
                    exit_code::SUCCESS
                };
                let _ = e.print();
                std::process::exit(code);
            }
        }
    }
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration file
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from parsed arguments
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or configuration error
    pub fn new(args: CliArgs) -> Result<Self> {
        let config = Config::load_from_file(args.config_file.as_deref())?;
        config.validate()?;
        Ok(Self { args, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Print a completion script if one was requested
    ///
    /// # Returns
    /// * `bool` - True if a script was printed and the run should stop
    pub fn handle_completion(&self) -> bool {
        match self.args.generate_completion {
            Some(shell) => {
                let mut command = CliArgs::command();
                clap_complete::generate(shell, &mut command, "solrdump", &mut std::io::stdout());
                true
            }
            None => false,
        }
    }

    /// Effective log level from flags, falling back to the config file
    pub fn log_level(&self) -> tracing::Level {
        let level = if self.args.very_verbose {
            LogLevel::Trace
        } else if self.args.verbose {
            LogLevel::Debug
        } else if self.args.quiet {
            LogLevel::Error
        } else {
            self.config.logging.level
        };
        level.to_tracing_level()
    }

    /// Build the immutable run configuration
    ///
    /// # Returns
    /// * `Result<DumpConfig>` - Run configuration or the first invalid argument
    pub fn build_dump_config(&self) -> Result<DumpConfig> {
        let args = &self.args;
        let defaults = &self.config.defaults;

        let link = args
            .colllink
            .as_deref()
            .ok_or_else(|| missing("colllink"))?;
        let endpoint = Endpoint::parse(link)?;

        let sort = SortSpec::parse(args.sort.as_deref().ok_or_else(|| missing("sort"))?)?;

        let rows = args.rows.unwrap_or(defaults.rows);
        if rows == 0 {
            return Err(invalid("rows", rows).into());
        }

        let http_timeout = args.http_timeout.unwrap_or(defaults.http_timeout);
        if http_timeout == 0 {
            return Err(invalid("http-timeout", http_timeout).into());
        }

        let dir_mode = parse_dir_perms(args.perms.as_deref().unwrap_or(&defaults.dir_perms))?;

        let query = QuerySpec::new(
            args.query.clone().unwrap_or_else(|| defaults.query.clone()),
            sort,
            parse_field_list(&args.fieldlist),
            rows,
        );

        let credentials = match (&args.user, &args.password) {
            (Some(user), password) if !user.is_empty() => Some(Credentials {
                user: user.clone(),
                password: password.clone(),
            }),
            (_, Some(_)) => {
                tracing::warn!("Password given without a user name, ignoring credentials");
                None
            }
            _ => None,
        };

        let show_progress = !args.no_progress && !args.quiet && std::io::stderr().is_terminal();

        Ok(DumpConfig {
            endpoint,
            query,
            credentials,
            http_timeout: Duration::from_secs(http_timeout),
            destination: args.dst.clone().unwrap_or_else(|| defaults.destination.clone()),
            dir_mode,
            channel_capacity: defaults.channel_capacity,
            show_progress,
        })
    }
}

fn missing(field: &str) -> ConfigError {
    invalid(field, "<missing>")
}

fn invalid(field: &str, value: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}
