//! Trait seams for the table store backing the logical stream.

use crate::{ChangeRecord, SyncError, SyncWindow, TrackedTable};
use async_trait::async_trait;

/// Metadata and change-feed access for the store that holds the tracked
/// table. Implemented by the BigQuery source; test fixtures provide an
/// in-memory implementation.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Existence check by exact physical identifier.
    ///
    /// A missing table is `Ok(false)`, not an error; failures the store
    /// cannot attribute to a missing table (permission, network) map to
    /// [`SyncError::Transient`] and must never be mistaken for rotation.
    async fn table_exists(&self, table: &TrackedTable) -> Result<bool, SyncError>;

    /// One bounded range query over the table's append feed for
    /// `[window.start, window.end)`.
    ///
    /// An empty result is a valid, non-error outcome. A table deleted
    /// between resolution and the query surfaces as
    /// [`SyncError::TableNotFound`] so the caller can re-resolve.
    async fn fetch_changes(
        &self,
        table: &TrackedTable,
        window: &SyncWindow,
    ) -> Result<Box<dyn ChangeStream>, SyncError>;
}

/// Lazy, single-pass, finite stream of change records from one range
/// query. Not restartable; a second read requires a new query.
#[async_trait]
pub trait ChangeStream: Send {
    /// Next record; `None` once the result set is exhausted.
    async fn next(&mut self) -> Option<Result<ChangeRecord, SyncError>>;
}
