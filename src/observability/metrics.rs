//! OpenTelemetry metrics, optionally exported over OTLP.
//!
//! Key metrics:
//! - subwriter_requests_total: Counter of subscribe requests by outcome
//! - subwriter_rows_written_total: Counter of committed subscription rows
//! - subwriter_request_latency_seconds: Histogram of subscribe latency

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{global, KeyValue};
use opentelemetry_sdk::metrics::{ManualReader, SdkMeterProvider};
use std::sync::OnceLock;

/// Global metrics instance.
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Subwriter metrics registry.
#[derive(Debug)]
pub struct Metrics {
    /// Subscribe requests, labelled by outcome.
    pub requests_total: Counter<u64>,
    /// Rows committed across all requests.
    pub rows_written: Counter<u64>,
    /// Request latency in seconds, from decode to commit.
    pub request_latency: Histogram<f64>,
}

impl Metrics {
    fn new(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("subwriter_requests_total")
                .with_description("Total number of subscribe requests")
                .with_unit("1")
                .init(),
            rows_written: meter
                .u64_counter("subwriter_rows_written_total")
                .with_description("Total number of committed subscription rows")
                .with_unit("1")
                .init(),
            request_latency: meter
                .f64_histogram("subwriter_request_latency_seconds")
                .with_description("Subscribe latency from decode to commit")
                .with_unit("s")
                .init(),
        }
    }
}

/// Initialize the metrics system.
///
/// This should be called once at startup. Subsequent calls are ignored.
///
/// # Arguments
///
/// * `otel_endpoint` - Optional OTLP endpoint for metrics export
pub fn init_metrics_with_endpoint(otel_endpoint: Option<&str>) {
    METRICS.get_or_init(|| {
        if let Some(endpoint) = otel_endpoint {
            use opentelemetry_otlp::{Protocol, WithExportConfig};

            let exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint)
                .with_protocol(Protocol::Grpc);

            match opentelemetry_otlp::new_pipeline()
                .metrics(opentelemetry_sdk::runtime::Tokio)
                .with_exporter(exporter)
                .with_period(std::time::Duration::from_secs(10))
                .build()
            {
                Ok(provider) => {
                    global::set_meter_provider(provider);
                    tracing::info!(endpoint, "OTLP metrics exporter configured");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to create OTLP exporter, using no-op metrics");
                    set_manual_provider();
                }
            }
        } else {
            // Metrics are recorded but not exported
            set_manual_provider();
        }

        let meter = global::meter("subwriter");
        Metrics::new(&meter)
    });
}

fn set_manual_provider() {
    let reader = ManualReader::builder().build();
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    global::set_meter_provider(provider);
}

/// Record a committed subscribe request.
pub fn record_success(rows: usize, latency_seconds: f64) {
    if let Some(m) = METRICS.get() {
        let attrs = [KeyValue::new("outcome", "success")];
        m.requests_total.add(1, &attrs);
        m.rows_written.add(rows as u64, &[]);
        m.request_latency.record(latency_seconds, &attrs);
    }
}

/// Record a failed subscribe request; `kind` labels the failure.
pub fn record_failure(kind: &'static str, latency_seconds: f64) {
    if let Some(m) = METRICS.get() {
        let attrs = [KeyValue::new("outcome", kind)];
        m.requests_total.add(1, &attrs);
        m.request_latency.record(latency_seconds, &attrs);
    }
}
