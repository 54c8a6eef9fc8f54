//! Subwriter: records region/sub-region subscriptions over HTTP.
//!
//! # Usage
//!
//! ```bash
//! subwriter --database ./data/subscriptions.db --port 8080
//! ```
//!
//! Environment variables can also be used:
//! - `SUBWRITER_DATABASE`: SQLite database file (required)
//! - `PORT`: Port to listen on
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use std::fs;
use subwriter::config::Config;
use subwriter::observability::metrics::init_metrics_with_endpoint;
use subwriter::observability::tracing::init_tracing;
use subwriter::server::{run_server, SUBSCRIBE_PATH};
use tokio::sync::watch;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        r#"
  Subwriter v{} - Subscription Writer

  Configuration:
    Address:    {}:{}
    Endpoint:   POST {}
    Database:   {}
    Log Level:  {}

  Press Ctrl+C to shutdown gracefully.
"#,
        version,
        config.host,
        config.port,
        SUBSCRIBE_PATH,
        config.database.display(),
        config.log_level
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration; a missing database path exits here
    let config = Config::parse_args();

    init_tracing(&config.log_level);

    init_metrics_with_endpoint(config.otel_endpoint.as_deref());

    if let Some(parent) = config.database.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    print_banner(&config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        // Wait for SIGTERM or SIGINT (Ctrl+C)
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating shutdown...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = ctrl_c.await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }

        let _ = shutdown_tx.send(true);
    });

    run_server(config, shutdown_rx).await?;

    tracing::info!("Subwriter shutdown complete");
    Ok(())
}
