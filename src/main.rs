//! precache - versioned offline cache for web application assets
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use precache::cli::commands::{self, Workspace};
use precache::cli::{Cli, Commands, LogFormat};
use precache::error::PrecacheResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PrecacheResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    // Init command doesn't need config loading
    if let Commands::Init(args) = cli.command {
        return commands::init(args).await;
    }

    let ws = Workspace::load(cli.config, cli.storage_dir).await?;

    match cli.command {
        Commands::Init(_) => unreachable!("Init handled above"),
        Commands::Install(args) => commands::install(args, &ws).await,
        Commands::Fetch(args) => commands::fetch(args, &ws).await,
        Commands::List(args) => commands::list(args, &ws).await,
        Commands::Entries(args) => commands::entries(args, &ws).await,
        Commands::Clear(args) => commands::clear(args, &ws).await,
        Commands::Config(args) => commands::config(args, &ws).await,
    }
}

/// 0 = warn (RUST_LOG respected), 1 = info, 2+ = debug
fn init_logging(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("precache=warn")),
        1 => EnvFilter::new("precache=info"),
        _ => EnvFilter::new("precache=debug"),
    };

    // stdout carries fetched bodies and JSON listings
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.without_time().init(),
        LogFormat::Json => builder.json().init(),
    }
}
