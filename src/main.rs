//! # Sensor Logger
//!
//! Log synchronized air-quality, particulate, motion and GPS readings to CSV.
//!
//! Usage: `sensor-logger [CONFIG_PATH]` (default `config/default.toml`).

use anyhow::{Context, Result};
use std::path::Path;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use sensor_logger::config::Config;
use sensor_logger::supervisor::Supervisor;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name stem for the diagnostic log
const LOG_FILE_NAME: &str = "sensor-logger.log";

/// Main entry point
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load and validate the configuration
///    - Set up logging (console, plus a daily log file if configured)
///    - Route Ctrl+C and SIGTERM to the stop signal
///
/// 2. **Session**
///    - Open the GPS port, sensors and status LED
///    - Warm up, then write one row per tick until stopped
///
/// 3. **Shutdown**
///    - Finish the current row, close the file, stop the GPS reader
///    - Report rows written and the file path
///
/// # Errors
///
/// Returns error if the configuration is invalid, a device or the output
/// file cannot be opened, or the output file stops accepting rows.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(config.logging.dir.as_deref())?;
    info!("Sensor Logger v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let supervisor = Supervisor::new(config)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });
    info!("Press Ctrl+C to stop logging");

    let summary = supervisor.run(stop_rx).await?;
    info!(
        "Wrote {} rows in {} ticks to {}",
        summary.rows_written,
        summary.ticks,
        summary.path.display()
    );

    Ok(())
}

/// Install the tracing subscriber
///
/// The returned guard flushes the log file when dropped and must live until exit.
fn init_logging(dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (file, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::io::stdout.and(file))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

/// Resolve on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
                    _ = terminate.recv() => info!("Received SIGTERM, shutting down..."),
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down...");
}
