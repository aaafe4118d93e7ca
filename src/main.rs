//! RSI auto-tune - main entry point
//!
//! This binary provides four subcommands:
//! - init: Resolve the parameters for live trading (cache or fresh run)
//! - optimize: Force a full optimization run
//! - status: Inspect the cached results
//! - download: Save the current price series to CSV

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rsi_autotune::TunerConfig;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "rsi-autotune")]
#[command(about = "RSI strategy parameter optimization with cached results", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve the parameters for live trading
    Init {
        /// Re-run optimization even if cached results are fresh
        #[arg(short, long)]
        force: bool,

        /// Print settings as JSON
        #[arg(long)]
        json: bool,

        /// Read `{symbol}_{interval}.csv` from this directory instead of the API
        #[arg(long)]
        offline: Option<PathBuf>,
    },

    /// Run a full optimization and print the leaderboard
    Optimize {
        /// Number of top results to show
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,

        /// Read `{symbol}_{interval}.csv` from this directory instead of the API
        #[arg(long)]
        offline: Option<PathBuf>,
    },

    /// Show the cached results and their freshness
    Status,

    /// Download the current price series to CSV
    Download {
        /// Output directory
        #[arg(short, long, default_value = "data")]
        output: PathBuf,
    },
}

const LOG_DIR: &str = "logs";

/// Install the tracing subscriber for one command invocation.
///
/// Every run gets its own `logs/{command}_{timestamp}.log`. The console layer
/// is left out when something else (progress bar, JSON on stdout) owns it.
fn setup_logging(verbose: bool, command_name: &str, console: bool) -> Result<PathBuf> {
    let log_dir = Path::new(LOG_DIR);
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let log_filename = format!("{command_name}_{stamp}.log");

    // HTTP stack stays at warn unless RUST_LOG says otherwise
    let directives = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        if verbose { "debug" } else { "info" }
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let file_layer = fmt::layer()
        .with_writer(tracing_appender::rolling::never(log_dir, &log_filename))
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console.then(|| {
        fmt::layer()
            .with_ansi(true)
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(log_dir.join(log_filename))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (command_name, console) = match &cli.command {
        Commands::Init { json, .. } => ("init", !*json),
        Commands::Optimize { .. } => ("optimize", false),
        Commands::Status => ("status", true),
        Commands::Download { .. } => ("download", true),
    };

    let log_path = setup_logging(cli.verbose, command_name, console)?;
    info!("Logging to {}", log_path.display());

    let config = TunerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init {
            force,
            json,
            offline,
        } => commands::init::run(config, force, json, offline),

        Commands::Optimize {
            top,
            sequential,
            offline,
        } => commands::optimize::run(config, top, sequential, offline),

        Commands::Status => commands::status::run(config),

        Commands::Download { output } => commands::download::run(config, output),
    }
}
