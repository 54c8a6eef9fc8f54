//! Configuration parsing for the subwriter server.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - A required database path (startup fails without it)

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::server::RouterOptions;

/// Subwriter: records region/sub-region subscriptions in atomic batches.
#[derive(Parser, Debug, Clone)]
#[command(name = "subwriter")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "SUBWRITER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Path to the SQLite database file
    #[arg(short, long, env = "SUBWRITER_DATABASE")]
    pub database: PathBuf,

    /// Maximum number of pooled database connections
    #[arg(long, env = "SUBWRITER_POOL_SIZE", default_value_t = 10)]
    pub pool_size: u32,

    /// How long a connection waits on a locked database before failing
    #[arg(long, env = "SUBWRITER_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Per-request deadline in milliseconds (0 disables)
    #[arg(long, env = "SUBWRITER_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    /// Largest accepted subscribe body in bytes
    #[arg(long, env = "SUBWRITER_MAX_BODY_BYTES", default_value_t = 16 * 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// OpenTelemetry collector endpoint for metrics export (optional)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otel_endpoint: Option<String>,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The request deadline, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            request_timeout: self.request_timeout(),
            max_body_bytes: self.max_body_bytes,
        }
    }

    /// Create a default configuration for testing.
    #[cfg(test)]
    pub fn test_config(database: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0, // Random port
            database,
            pool_size: 4,
            busy_timeout_ms: 1000,
            request_timeout_ms: 0,
            max_body_bytes: 1024 * 1024,
            log_level: "debug".into(),
            otel_endpoint: None,
        }
    }
}
