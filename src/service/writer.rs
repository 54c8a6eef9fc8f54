//! Transactional batch writer.
//!
//! Writes all rows of one request inside a single unit of work. The first
//! failing insert aborts the whole batch; nothing is retried.

use std::fmt;
use tokio_util::sync::CancellationToken;

use crate::error::SubscribeError;
use crate::model::SubscriptionRow;
use crate::storage::{SubscriptionStore, UnitOfWork};

/// Per-request progress through the write pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Received,
    Decoded,
    TransactionOpen,
    Writing,
    Committed,
    Aborted,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Decoded => "decoded",
            Self::TransactionOpen => "transaction_open",
            Self::Writing => "writing",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Write `rows` atomically, returning how many were committed.
///
/// Blocks on the store; call from a blocking-capable thread. `cancel` is
/// checked before every insert and before commit so an abandoned request
/// rolls back instead of committing.
pub fn write_batch<S, I>(
    store: &S,
    rows: I,
    cancel: &CancellationToken,
) -> Result<usize, SubscribeError>
where
    S: SubscriptionStore,
    I: IntoIterator<Item = SubscriptionRow>,
{
    let mut uow = store.begin().map_err(|e| {
        tracing::debug!(stage = %WriteStage::Aborted, from = %WriteStage::Decoded, "Batch aborted");
        SubscribeError::TransactionOpen(e)
    })?;
    tracing::trace!(stage = %WriteStage::TransactionOpen, "Transaction opened");

    let mut written = 0usize;
    for row in rows {
        if cancel.is_cancelled() {
            abort(uow, WriteStage::Writing);
            return Err(SubscribeError::Cancelled);
        }
        if let Err(source) = uow.insert(&row) {
            abort(uow, WriteStage::Writing);
            return Err(SubscribeError::Write {
                index: written,
                source,
            });
        }
        written += 1;
    }

    if cancel.is_cancelled() {
        abort(uow, WriteStage::Writing);
        return Err(SubscribeError::Cancelled);
    }

    // Cancellation is not observed past this point: a deadline that fires
    // during COMMIT still reports failure while the rows persist.
    // A failed commit leaves the transaction open; the unit of work's drop
    // rolls it back.
    uow.commit().map_err(SubscribeError::Commit)?;

    tracing::debug!(stage = %WriteStage::Committed, rows = written, "Batch committed");
    Ok(written)
}

fn abort<U: UnitOfWork>(uow: U, from: WriteStage) {
    if let Err(e) = uow.rollback() {
        tracing::warn!(error = %e, "Rollback failed");
    }
    tracing::debug!(stage = %WriteStage::Aborted, from = %from, "Batch aborted");
}
