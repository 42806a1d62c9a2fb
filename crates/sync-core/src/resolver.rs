//! Logical-to-physical table resolution across daily rotation.

use crate::{SyncError, TableStore, TrackedTable};
use chrono::NaiveDate;

/// Resolve the physical table currently backing `prefix` for `date`.
///
/// A missing table is interpreted as same-day rotation: the intraday table
/// was deleted once its full-day counterpart was finalized, so resolution
/// retries against the next calendar day. Under the normal daily cadence
/// this terminates after at most one rotation; if the successor is also
/// missing, the one-day-advance assumption has been violated and the
/// error is fatal.
///
/// Transient existence-check failures propagate unchanged and never
/// trigger a date advance.
pub async fn resolve_table(
    store: &dyn TableStore,
    prefix: &str,
    date: NaiveDate,
) -> Result<TrackedTable, SyncError> {
    let candidate = TrackedTable::new(prefix, date);
    if store.table_exists(&candidate).await? {
        return Ok(candidate);
    }

    let successor = candidate.successor();
    tracing::info!(missing = %candidate, candidate = %successor, "tracked table rotated; resolving successor");
    if store.table_exists(&successor).await? {
        return Ok(successor);
    }

    Err(SyncError::Configuration(format!(
        "neither {candidate} nor {successor} exists; \
         daily rotation is expected to advance by exactly one day"
    )))
}
