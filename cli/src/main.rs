//! magecheck CLI
//!
//! Audits the network traffic of a web page for skimmer indicators and
//! requests to unexpected destinations.
//!
//! # Usage
//!
//! ```bash
//! magecheck scan https://shop.example/checkout
//! magecheck scan har_files/checkout.har --list --shape domain-only
//! magecheck scan checkout.har --content-type javascript --format json
//! magecheck config set indicators_path /etc/magecheck/url-patterns.txt
//! ```
//!
//! Exit status is 0 for a clean run, 2 when something was flagged and 1 on error.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod capture;
mod commands;
mod config;
mod output;

use commands::scan::ShapeArg;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "magecheck")]
#[command(author, version)]
#[command(about = "Audit a web page's network traffic for skimmer indicators", long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, short, global = true)]
    format: Option<OutputFormat>,

    /// Profile name from config file
    #[arg(long, short, global = true, env = "MAGECHECK_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a page (or load a saved HAR) and classify its requests
    Scan(ScanArgs),
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Page URL to capture, or path to a saved .har file
    pub target: String,

    /// List the captured requests
    #[arg(long)]
    pub list: bool,

    /// Only list requests whose content-type contains TERM (repeatable, comma separated)
    #[arg(long = "content-type", value_name = "TERM", value_delimiter = ',')]
    pub content_types: Vec<String>,

    /// How listed URLs are shown
    #[arg(long, value_enum)]
    pub shape: Option<ShapeArg>,

    /// Indicator list, one fragment per line
    #[arg(long, env = "MAGECHECK_INDICATORS")]
    pub indicators: Option<PathBuf>,

    /// Expected-destination list, one fragment per line
    #[arg(long, env = "MAGECHECK_EXPECTATIONS")]
    pub expectations: Option<PathBuf>,

    /// Skip the expected-destination check
    #[arg(long)]
    pub no_expectations: bool,

    /// Match fragments ignoring case
    #[arg(long)]
    pub case_insensitive: bool,

    /// Treat fragments as literal text instead of regular expressions
    #[arg(long)]
    pub literal: bool,

    /// Directory captured logs are saved to
    #[arg(long, env = "MAGECHECK_HAR_DIR")]
    pub har_dir: Option<PathBuf>,

    /// Do not save the captured log
    #[arg(long)]
    pub no_save: bool,

    /// Milliseconds to keep recording after the page has loaded
    #[arg(long, env = "MAGECHECK_SETTLE_MS")]
    pub settle_ms: Option<u64>,

    /// Write the report as JSON to FILE instead of printing it
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(false) => {}
        Ok(true) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Dispatch a parsed command; returns true when a scan flagged something
async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Scan(args) => {
            let config = config::Config::load(cli.profile.as_deref())?;
            let format = cli
                .format
                .or_else(|| config.default_format.as_deref().and_then(OutputFormat::from_name))
                .unwrap_or(OutputFormat::Text);
            commands::scan::handle(args, &config, format).await
        }
        Commands::Config { action } => commands::config::handle(action, cli.profile.as_deref())
            .await
            .map(|_| false),
    }
}
