//! Wire types for the subscribe endpoint and the persisted row shape.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Why a request body could not be turned into a [`SubscriptionRequest`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid request body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("userId cannot be empty")]
    EmptyUserId,
}

/// A user's full set of subscriptions, as sent by the client.
///
/// `subscriptions` maps a region (county) to the sub-regions (towns)
/// subscribed within it. A region may map to an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub user_id: String,
    pub subscriptions: HashMap<String, Vec<String>>,
}

impl SubscriptionRequest {
    /// Decode an untrusted request body.
    ///
    /// Both `userId` and `subscriptions` must be present; unknown fields are
    /// ignored.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let request: Self = serde_json::from_slice(body)?;
        if request.user_id.is_empty() {
            return Err(DecodeError::EmptyUserId);
        }
        Ok(request)
    }

    /// Total number of rows this request expands to.
    pub fn row_count(&self) -> usize {
        self.subscriptions.values().map(Vec::len).sum()
    }

    /// Flatten into one row per (region, sub-region) pair.
    ///
    /// Every row carries the same `created_at`. Row order follows the map's
    /// iteration order and is not meaningful.
    pub fn into_rows(self, created_at: i64) -> impl Iterator<Item = SubscriptionRow> {
        let user_id = self.user_id;
        self.subscriptions
            .into_iter()
            .flat_map(move |(region, sub_regions)| {
                let user_id = user_id.clone();
                sub_regions.into_iter().map(move |sub_region| SubscriptionRow {
                    user_id: user_id.clone(),
                    region: region.clone(),
                    sub_region,
                    created_at,
                })
            })
    }
}

/// One persisted subscription.
///
/// Stored as `(user_id, county, town, created_at)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRow {
    pub user_id: String,
    pub region: String,
    pub sub_region: String,
    /// Unix timestamp in milliseconds, shared by all rows of one request.
    pub created_at: i64,
}

/// Body returned on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub success: bool,
}

impl SubscribeResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
