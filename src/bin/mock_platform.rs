//! Mock training-management platform for manual and integration testing
//!
//! Serves the state, finished and echo test methods the training
//! application calls, logging each call until Ctrl+C.

use clap::Parser;
use training_bridge::common::logging;
use training_bridge::testing::StubPlatform;

#[derive(Parser)]
#[command(name = "mock-platform", about = "Stub XML-RPC training-management platform")]
struct Args {
    /// Port to listen on (0 picks a free port)
    #[arg(long, default_value = "0")]
    port: u16,
}

#[tokio::main]
async fn main() {
    logging::init_cli();
    let args = Args::parse();

    let platform = match StubPlatform::start(args.port).await {
        Ok(platform) => platform,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // Printed for scripts that need the port
    println!("listening at: {}", platform.url());
    tracing::info!(addr = %platform.addr(), "Mock platform ready");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to wait for Ctrl+C: {}", e);
    }

    for call in platform.calls() {
        tracing::info!(method = %call.method, "Recorded call");
    }
    platform.stop().await;
}
