//! Core types for the bq-stream-sync pipeline.
//!
//! This crate provides the foundational pieces shared by the BigQuery
//! source, the Pub/Sub sink, and the orchestrating sync loop:
//!
//! - [`SyncWindow`] - The half-open `[start, end)` time range bounding one
//!   iteration's change-feed read
//! - [`TrackedTable`] - The physical table currently backing the logical
//!   analytics stream, with its `{prefix}_{YYYYMMDD}` identifier
//! - [`ChangeRecord`] / [`OutboundEvent`] - A captured row and its wire form
//! - [`SyncError`] - The error taxonomy that drives retry vs. rotation vs.
//!   fatal-exit decisions
//! - [`TableStore`] / [`ChangeStream`] / [`EventTransport`] - The trait
//!   seams behind which the concrete Google Cloud clients live
//! - [`resolve_table`] - Logical-to-physical resolution across daily
//!   table rotation
//!
//! # Architecture
//!
//! sync-core sits at the foundation of the workspace:
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── bigquery-source  (implements TableStore over the BigQuery API)
//!    ├─── pubsub-sink      (implements EventTransport over Pub/Sub)
//!    └─── bq-stream-sync   (the CLI and the sync loop orchestrator)
//! ```

pub mod error;
pub mod resolver;
pub mod sink;
pub mod source;
pub mod table;
pub mod types;
pub mod window;

// Re-exports for convenience
pub use error::SyncError;
pub use resolver::resolve_table;
pub use sink::EventTransport;
pub use source::{ChangeStream, TableStore};
pub use table::TrackedTable;
pub use types::{ChangeRecord, ChangeType, OutboundEvent};
pub use window::SyncWindow;
