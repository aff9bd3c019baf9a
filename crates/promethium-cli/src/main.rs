//! Promethium Command-Line Interface
//!
//! The main entry point for the `promethium` tool.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use promethium::config::ensure_config;
use promethium_cli::cli::{Cli, Commands};
use promethium_cli::commands::{common, config, files, workflows};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    if let Err(e) = ensure_config(None) {
        tracing::debug!("Could not seed config file: {e}");
    }

    // Execute command
    let result = match cli.command {
        Commands::Config { action } => config::execute(action),

        Commands::Workflows { action } => {
            match common::build_client(cli.api_key.as_deref(), cli.base_url.as_deref()) {
                Ok(client) => workflows::execute(&client, action).await,
                Err(e) => Err(e),
            }
        }

        Commands::Files { action } => {
            match common::build_client(cli.api_key.as_deref(), cli.base_url.as_deref()) {
                Ok(client) => files::execute(&client, action).await,
                Err(e) => Err(e),
            }
        }
    };

    // Handle errors
    if let Err(e) = result {
        if let Some(steps) = common::config_error(&e).and_then(common::remediation) {
            eprintln!("{steps}");
        } else if cli.verbose > 0 {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
        } else {
            eprintln!("{} {}", style("Error:").red().bold(), e);
        }
        std::process::exit(1);
    }

    Ok(())
}
