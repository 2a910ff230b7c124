pub mod batch;
pub mod record_service;
pub mod teacher_service;

use std::fmt::Display;
use std::time::Duration;

use thiserror::Error;
use tokio::time::error::Elapsed;
use tokio::time::Instant;
use tracing::warn;

use crate::database::{DatabaseError, Store, StoreTx};
use crate::filter::FilterError;
use crate::record::RecordError;

pub use batch::{apply_batch, delete_many, BatchError};
pub use record_service::RecordService;
pub use teacher_service::TeacherService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("{label} not found")]
    NotFound { label: &'static str, id: i64 },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Open a transaction, giving up once `expires` passes. Waiting for a
/// pooled connection (or the memory store's lock) counts against the same
/// deadline as the work itself.
pub(crate) async fn begin_within<E>(
    store: &dyn Store,
    expires: Instant,
    deadline: Duration,
    timed_out: fn(Duration) -> E,
) -> Result<Box<dyn StoreTx>, E>
where
    E: From<DatabaseError>,
{
    match tokio::time::timeout_at(expires, store.begin()).await {
        Ok(tx) => Ok(tx?),
        Err(_) => {
            warn!("Could not begin a transaction within {:?}", deadline);
            Err(timed_out(deadline))
        }
    }
}

/// Finish a transaction from the outcome of its deadline-bounded work:
/// commit on success, roll back on error. On expiry the work future has
/// already been dropped; dropping `tx` discards its changes.
pub(crate) async fn settle<T, E>(
    tx: Box<dyn StoreTx>,
    outcome: Result<Result<T, E>, Elapsed>,
    deadline: Duration,
    timed_out: fn(Duration) -> E,
) -> Result<T, E>
where
    E: From<DatabaseError> + Display,
{
    match outcome {
        Ok(Ok(value)) => {
            tx.commit().await?;
            Ok(value)
        }
        Ok(Err(err)) => {
            warn!("Rolling back transaction: {}", err);
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
        Err(_) => {
            warn!("Transaction exceeded {:?}, rolling back", deadline);
            drop(tx);
            Err(timed_out(deadline))
        }
    }
}
