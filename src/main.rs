//! Main entry point for the catalog-harvester CLI

use catalog_harvester::cli::{Cli, Commands};
use catalog_harvester::metrics;
use catalog_harvester::shutdown::ShutdownCoordinator;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_harvester=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(addr) = cli.metrics_addr {
        metrics::init_metrics(addr)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    }

    let shutdown = ShutdownCoordinator::shared();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing in-flight downloads...");
                shutdown.request_shutdown();
            }
        }
    });

    match cli.command {
        Commands::Download(ref args) => {
            args.execute(&cli, shutdown).await?;
        }
        Commands::List(ref args) => {
            args.execute(&cli, shutdown).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}
