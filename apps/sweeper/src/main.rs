//! # boxoffice-sweeper
//!
//! Expires past events on a fixed interval.
//!
//! ```text
//! boxoffice-sweeper [CONFIG_PATH] [--once]
//!
//!   CONFIG_PATH   boxoffice.toml (default: platform config dir)
//!   --once        run a single sweep and exit
//!
//!   RUST_LOG      log filter (default: info)
//! ```

use std::path::PathBuf;

use anyhow::Context;
use boxoffice_engine::{open_database, BoxOfficeConfig, EventLifecycle, ExpirySweeper};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let mut config_path = None;
    let mut once = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--once" => once = true,
            path => config_path = Some(PathBuf::from(path)),
        }
    }

    // Payment settings are not needed to expire events.
    let config = BoxOfficeConfig::read(config_path).context("Failed to load configuration")?;
    config
        .validate_storage()
        .context("Invalid database or sweeper configuration")?;
    info!(
        db_path = %config.database.path.display(),
        interval_secs = config.sweeper.interval_secs,
        "Configuration loaded"
    );

    let db = open_database(&config.database)
        .await
        .context("Failed to open box office store")?;
    let lifecycle = EventLifecycle::new(db.clone());

    if once {
        let expired = lifecycle.sweep_expired().await?;
        info!(expired, "Single sweep complete");
        db.close().await;
        return Ok(());
    }

    let (sweeper, handle) = ExpirySweeper::new(lifecycle, config.sweeper.interval());
    let task = tokio::spawn(sweeper.run());

    shutdown_signal().await;

    if let Err(e) = handle.shutdown().await {
        error!(?e, "Sweeper had already stopped");
    }
    if let Err(e) = task.await {
        error!(?e, "Sweeper task panicked");
    }

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to listen for Ctrl+C");
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
                error!(?e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, stopping sweeper...");
}
