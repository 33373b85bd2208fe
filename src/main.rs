//! feedpager - cursor-based feed pagination
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use feedpager::cli::{Cli, Commands};
use feedpager::config::ConfigManager;
use feedpager::error::FeedResult;
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

async fn run() -> FeedResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("feedpager=warn"),
        1 => EnvFilter::new("feedpager=info"),
        _ => EnvFilter::new("feedpager=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs || config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }

    match cli.command {
        Commands::Browse(args) => feedpager::cli::commands::browse(args, &config).await,
        Commands::Config(args) => {
            feedpager::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
