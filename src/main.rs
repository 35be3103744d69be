//! Training bridge - example training application for an XML-RPC platform
//!
//! Listens for the platform's calls and forwards operator actions to it.

use std::path::PathBuf;

use clap::Parser;
use training_bridge::commands::Commands;
use training_bridge::{cli, common::logging};

#[derive(Parser)]
#[command(name = "training-bridge", about = "Example training application bridged over XML-RPC")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (application.properties or .toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let guard = match cli.command {
        Commands::Run => {
            let (log_file, guard) = logging::init_app();
            if let Some(path) = log_file {
                tracing::debug!(path = %path.display(), "Logging to file");
            }
            guard
        }
        _ => {
            logging::init_cli();
            None
        }
    };

    let result = cli::dispatch(cli.command, cli.config.as_deref()).await;

    if let Err(e) = result {
        if e.is_fatal() {
            tracing::error!(kind = ?e.kind(), "Cannot start: {}", e);
        } else {
            tracing::error!("{}", e);
        }
        eprintln!("Error: {e}");
        drop(guard);
        std::process::exit(e.exit_code());
    }
}
