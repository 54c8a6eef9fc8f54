//! Failure taxonomy for the subscribe endpoint.
//!
//! Client-caused failures map to 4xx, store-caused failures to 500. Response
//! bodies are fixed plain-text messages; details only go to the log.

use axum::extract::rejection::BytesRejection;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::model::DecodeError;
use crate::storage::StoreError;

/// Why a subscribe request did not commit.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("failed to read request body: {0}")]
    Body(#[from] BytesRejection),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to open transaction: {0}")]
    TransactionOpen(#[source] StoreError),

    #[error("failed to write row {index}: {source}")]
    Write {
        index: usize,
        #[source]
        source: StoreError,
    },

    #[error("failed to commit transaction: {0}")]
    Commit(#[source] StoreError),

    #[error("request cancelled before commit")]
    Cancelled,

    #[error("write task failed: {0}")]
    Task(String),
}

impl SubscribeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Body(_) | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::TransactionOpen(_)
            | Self::Write { .. }
            | Self::Commit(_)
            | Self::Cancelled
            | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::Body(_) => "body",
            Self::Decode(_) => "decode",
            Self::TransactionOpen(_) => "transaction_open",
            Self::Write { .. } => "write",
            Self::Commit(_) => "commit",
            Self::Cancelled => "cancelled",
            Self::Task(_) => "task",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for SubscribeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_client_error() {
            tracing::warn!(error = %self, kind = self.kind(), "Rejected subscribe request");
        } else {
            tracing::error!(error = %self, kind = self.kind(), "Subscribe request failed");
        }

        let message = match status {
            StatusCode::METHOD_NOT_ALLOWED => "Method not allowed",
            StatusCode::BAD_REQUEST => "Bad request",
            _ => "Internal server error",
        };
        (status, message).into_response()
    }
}
