//! Observability infrastructure.
//!
//! Provides:
//! - Structured tracing via tracing-subscriber
//! - OpenTelemetry metrics for subscribe requests

pub mod metrics;
pub mod tracing;
