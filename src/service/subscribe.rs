//! `POST /subscribeAll` handler.
//!
//! Decodes the body, expands it into rows stamped with one shared timestamp,
//! and hands the batch to [`write_batch`] on the blocking pool.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::Method;
use axum::Json;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::SubscribeError;
use crate::model::{SubscribeResponse, SubscriptionRequest};
use crate::now_millis;
use crate::observability::metrics::{record_failure, record_success};
use crate::server::AppState;
use crate::service::writer::{write_batch, WriteStage};
use crate::storage::SubscriptionStore;

/// Handle a subscribe request.
///
/// Any content type is accepted; the body must be the JSON request object.
/// A body that cannot be read, including one over the route's size limit, is
/// rejected like an undecodable one.
#[tracing::instrument(skip(state, body), fields(user_id, rows, stage = %WriteStage::Received))]
pub async fn handle_subscribe<S: SubscriptionStore>(
    State(state): State<AppState<S>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SubscribeResponse>, SubscribeError> {
    let start = Instant::now();

    let result = match body {
        Ok(body) => subscribe(&state, &body).await,
        Err(rejection) => Err(rejection.into()),
    };

    match result {
        Ok(rows) => {
            let latency = start.elapsed().as_secs_f64();
            record_success(rows, latency);
            tracing::Span::current().record("stage", tracing::field::display(WriteStage::Committed));
            tracing::debug!(rows, latency_ms = latency * 1000.0, "Subscriptions recorded");
            Ok(Json(SubscribeResponse::ok()))
        }
        Err(e) => {
            record_failure(e.kind(), start.elapsed().as_secs_f64());
            if !e.is_client_error() {
                tracing::Span::current()
                    .record("stage", tracing::field::display(WriteStage::Aborted));
            }
            Err(e)
        }
    }
}

async fn subscribe<S: SubscriptionStore>(
    state: &AppState<S>,
    body: &[u8],
) -> Result<usize, SubscribeError> {
    let request = SubscriptionRequest::decode(body)?;

    let span = tracing::Span::current();
    span.record("user_id", request.user_id.as_str());
    span.record("rows", request.row_count());
    span.record("stage", tracing::field::display(WriteStage::Decoded));

    let created_at = now_millis();
    let rows: Vec<_> = request.into_rows(created_at).collect();

    let store = Arc::clone(&state.store);
    let cancel = CancellationToken::new();
    // Dropping this future (e.g. on request timeout) cancels the token and
    // the blocking writer rolls back instead of committing.
    let _guard = cancel.clone().drop_guard();

    tokio::task::spawn_blocking(move || write_batch(store.as_ref(), rows, &cancel))
        .await
        .map_err(|e| SubscribeError::Task(e.to_string()))?
}

/// Fallback for every method other than POST.
pub async fn method_not_allowed(method: Method) -> SubscribeError {
    let err = SubscribeError::MethodNotAllowed(method);
    record_failure(err.kind(), 0.0);
    err
}
