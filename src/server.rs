//! HTTP server setup and lifecycle.
//!
//! Configures the axum router with:
//! - The subscribe endpoint and its method gate
//! - Health and readiness checks
//! - Request IDs, request tracing and an optional request deadline
//! - Graceful shutdown support

use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::generate_request_id;
use crate::service::{handle_subscribe, method_not_allowed};
use crate::storage::{SqliteStore, SubscriptionStore};

/// Path of the subscribe endpoint.
pub const SUBSCRIBE_PATH: &str = "/subscribeAll";

/// State shared across handlers.
///
/// The store is injected rather than global so tests can substitute their own.
pub struct AppState<S> {
    pub store: Arc<S>,
}

impl<S> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

/// Router-level limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    /// Deadline for a whole request; `None` disables it.
    pub request_timeout: Option<Duration>,
    /// Largest subscribe body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            request_timeout: None,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Issues time-sortable UUIDv7 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&generate_request_id())
            .ok()
            .map(RequestId::new)
    }
}

/// Create the HTTP router.
///
/// When `options.request_timeout` is set, a request exceeding it is dropped,
/// which rolls back any transaction it had open, and answered with 500.
/// Subscribe bodies over `options.max_body_bytes` are answered with 400.
pub fn create_router<S: SubscriptionStore>(state: AppState<S>, options: RouterOptions) -> Router {
    let router = Router::new()
        .route(
            SUBSCRIBE_PATH,
            post(handle_subscribe::<S>)
                .fallback(method_not_allowed)
                .layer(DefaultBodyLimit::max(options.max_body_bytes)),
        )
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler::<S>))
        .with_state(state);

    let router = match options.request_timeout {
        Some(timeout) => router.layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(timeout)),
        ),
        None => router,
    };

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id,
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

/// Handle GET /health - Basic health check.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Handle GET /ready - Readiness check against the store.
async fn ready_handler<S: SubscriptionStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || store.check()).await {
        Ok(Ok(())) => (StatusCode::OK, "READY"),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
        Err(e) => {
            tracing::error!(error = %e, "Readiness check panicked");
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }
}

async fn handle_timeout_error(err: tower::BoxError) -> (StatusCode, &'static str) {
    tracing::error!(error = %err, "Request aborted");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Serve `router` on an already bound listener until `shutdown_rx` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            // Wait for shutdown signal
            let _ = shutdown_rx.changed().await;
            tracing::info!("Shutdown signal received, stopping server");
        })
        .await
}

/// Run the subwriter HTTP server.
///
/// # Arguments
///
/// * `config` - Server configuration
/// * `shutdown_rx` - Receiver for shutdown signal
///
/// # Returns
///
/// Returns when the server has shut down.
pub async fn run_server(config: Config, shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let store = SqliteStore::open(&config.database, config.pool_size, config.busy_timeout())?;
    tracing::info!(database = %config.database.display(), "Connected to database");

    let router = create_router(AppState::new(store), config.router_options());

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "Starting subwriter HTTP server");

    serve(listener, router, shutdown_rx).await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_router(temp_dir: &TempDir) -> Router {
        let config = Config::test_config(temp_dir.path().join("test.db"));
        let store =
            SqliteStore::open(&config.database, config.pool_size, config.busy_timeout()).unwrap();
        create_router(AppState::new(store), config.router_options())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_router(&temp_dir);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_endpoint() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_router(&temp_dir);

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_router(&temp_dir);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_app_state_shares_store() {
        let state = AppState::new(42_u8);
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.store, &cloned.store));
    }
}
