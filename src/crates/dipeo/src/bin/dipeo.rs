//! dipeo CLI - visual programming diagram compiler and executor
//!
//! Main entry point for the dipeo command-line tool.

use std::sync::Arc;

use clap::Parser;
use dipeo::cli::{Cli, Command};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = dipeo::config::load_config().await?;
    let _ = dipeo_utils::init_tracing(Some(&config.logging.level));

    let shutdown_coordinator = Arc::new(dipeo::ShutdownCoordinator::new());
    let _signal_handler = shutdown_coordinator.install_signal_handlers();

    let cancellation = CancellationToken::new();
    let bridge = {
        let coordinator = shutdown_coordinator.clone();
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            coordinator.wait_for_shutdown().await;
            cancellation.cancel();
        })
    };

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Compile { diagram } => dipeo::cli::run_compile(&diagram).await,
        Command::Validate { diagram } => dipeo::cli::run_validate(&diagram).await,
        Command::Run { diagram, variables, concurrency } => {
            dipeo::cli::run_execute(&diagram, variables.as_deref(), concurrency, &config, cancellation).await
        }
    };
    bridge.abort();

    if let Err(e) = &result {
        eprintln!("error: {e}");
    }
    result.map_err(Into::into)
}
