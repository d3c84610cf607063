//! Calendar service binary.
//!
//! Loads configuration, opens the configured store and runs the enabled
//! protocol servers until Ctrl-C, SIGTERM, or one of them exits.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use calendar::app::Calendar;
use calendar::config::Config;
use calendar::server::build_servers;
use calendar::storage::init_storage;
use calendar::utils::bootstrap::init_tracing;

#[derive(Parser)]
#[command(name = "calendar")]
#[command(about = "Calendar event service over gRPC and REST/JSON")]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the version and exit
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    if let Some(path) = init_tracing(&config.logger)? {
        info!(path = %path.display(), "Writing log file");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "Starting calendar");

    let store = init_storage(&config.storage).await?;
    let app = Arc::new(Calendar::new(store));
    let servers = build_servers(app, &config.server)?;
    if servers.is_empty() {
        warn!("No protocols enabled, nothing to serve");
        return Ok(());
    }

    let mut running = JoinSet::new();
    for server in &servers {
        let server = server.clone();
        running.spawn(async move { (server.kind(), server.start().await) });
    }

    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown signal received"),
        Some(joined) = running.join_next() => match joined {
            Ok((kind, Ok(()))) => warn!(server = %kind, "Server exited"),
            Ok((kind, Err(e))) => error!(server = %kind, error = %e, "Server failed"),
            Err(e) => error!(error = %e, "Server task panicked"),
        },
    }

    for server in &servers {
        server.stop();
    }
    while let Some(joined) = running.join_next().await {
        if let Ok((kind, Err(e))) = joined {
            error!(server = %kind, error = %e, "Server failed during shutdown");
        }
    }

    info!("Calendar stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
