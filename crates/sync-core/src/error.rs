//! Error taxonomy for the sync pipeline.

use thiserror::Error;

/// Errors surfaced by the table store, the transport, and the sync loop.
///
/// Only [`SyncError::Configuration`] is fatal; every other kind is handled
/// at the phase boundary where it occurs.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The physical table backing the logical stream does not exist.
    ///
    /// Expected in the common case: the intraday table is deleted once its
    /// full-day counterpart is finalized. The resolver consumes this by
    /// advancing one calendar day.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Retryable service failure (network, quota, timeout).
    #[error("transient service error: {0}")]
    Transient(String),

    /// A single event submission was rejected by the transport.
    ///
    /// Never aborts a batch; reported per record so the failed rows can be
    /// replayed manually.
    #[error("publish rejected: {0}")]
    Publish(String),

    /// Invalid input, or an unmet operating assumption (e.g. rotation
    /// skipping more than one day). The process exits non-zero.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SyncError {
    /// Whether this error should terminate the sync loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_is_fatal() {
        assert!(SyncError::Configuration("bad".into()).is_fatal());
        assert!(!SyncError::TableNotFound("t".into()).is_fatal());
        assert!(!SyncError::Transient("net".into()).is_fatal());
        assert!(!SyncError::Publish("rejected".into()).is_fatal());
    }
}
