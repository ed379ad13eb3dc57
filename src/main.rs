//! mcp-memories: MCP server giving AI assistants a persistent, project-scoped memory
//!
//! Reads JSON-RPC requests from stdin and writes responses to stdout. Logs go
//! to stderr or to the configured log file, never to stdout.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use mcp_memories::config;
use mcp_memories::error::ConfigError;
use mcp_memories::mcp::{McpServer, Session, StdioTransport};
use mcp_memories::store::Store;

/// MCP server giving AI assistants a persistent, project-scoped memory.
///
/// Stores memories, tasks, metadata, file annotations, guidelines and
/// bookmarks in a local SQLite database.
#[derive(Parser, Debug)]
#[command(name = "mcp-memories")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the configuration)
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Logs are appended to `log_file` when given, otherwise written to stderr.
fn init_tracing(level: Level, log_file: Option<&Path>) -> Result<(), ConfigError> {
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| ConfigError::LogFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

/// Entry point for the mcp-memories server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig read from: {}", default_path.display());
                    eprintln!("See config/example-config.json for the format");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    if let Some(database) = args.database {
        cfg.database_path = config::expand_home(&database);
    }

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    if let Err(e) = init_tracing(log_level, cfg.logging.file.as_deref()) {
        eprintln!("Logging error: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting mcp-memories server"
    );

    // Open the knowledge store
    let store = match Store::open(&cfg.database_path) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, path = %cfg.database_path.display(), "Failed to open database");
            eprintln!("Database error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let default_project = match store.resolve_project(&cfg.default_project) {
        Ok(project) => project,
        Err(e) => {
            error!(error = %e, slug = %cfg.default_project, "Failed to resolve default project");
            eprintln!("Database error: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        database = %cfg.database_path.display(),
        default_project = %default_project.slug,
        max_message_bytes = cfg.max_message_bytes,
        "Knowledge store ready"
    );

    let server = McpServer::new(
        StdioTransport::stdio(cfg.max_message_bytes),
        Arc::new(store),
        Session::new(default_project.id),
    );

    // Run the server
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(server.run());

    // A pending stdin read after a signal would otherwise hold the runtime open.
    runtime.shutdown_background();

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
