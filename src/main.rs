//! solrdump
//!
//! Dumps documents from a Solr collection into numbered JSON files, one file
//! per page of results, inside a new timestamped directory.
//!
//! # Usage
//!
//! ```bash
//! solrdump -c http://localhost:8983/solr/books -s "id asc" -r 50000 -d /backups
//! ```

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use solrdump::cli::{CliArgs, CliInterface};
use solrdump::error::{exit_code, Result};
use solrdump::{run_dump, SolrCursorSource};

/// Application entry point
#[tokio::main]
async fn main() {
    let args = CliArgs::parse_or_exit();

    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Main application logic
///
/// 1. Load configuration and merge it with the arguments
/// 2. Initialize logging
/// 3. Handle completion generation or run the dump
///
/// # Returns
/// * `Result<i32>` - Process exit code, or a fatal error
async fn run(args: CliArgs) -> Result<i32> {
    let cli = CliInterface::new(args)?;

    if cli.handle_completion() {
        return Ok(exit_code::SUCCESS);
    }

    initialize_logging(&cli);

    let config = cli.build_dump_config()?;
    debug!("Dumping from {} with {:?}", config.endpoint, config.query);

    let source = Box::new(SolrCursorSource::new(&config)?);

    // Ctrl+C stops requesting pages; writes already dispatched still finish.
    let cancel_token = CancellationToken::new();
    let cancel_token_clone = cancel_token.clone();
    let ctrl_c_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => cancel_token_clone.cancel(),
            Err(err) => eprintln!("Failed to listen for Ctrl+C: {}", err),
        }
    });

    let outcome = run_dump(&config, source, Some(cancel_token)).await;
    ctrl_c_handle.abort();

    Ok(outcome?.exit_code())
}

/// Initialize logging system based on verbosity level
///
/// `RUST_LOG` takes precedence over the flags and the config file.
///
/// # Arguments
/// * `cli` - CLI interface with verbosity settings
fn initialize_logging(cli: &CliInterface) {
    let level = cli.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(level).into()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
