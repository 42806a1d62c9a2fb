//! BigQuery change-feed source for bq-stream-sync.
//!
//! Implements the [`sync_core::TableStore`] seam over the BigQuery API:
//! the table-existence check goes through the tables metadata endpoint
//! (a lookup, not a data read), and the change feed is a parameterized
//! range query over the `APPENDS` table-valued function with its
//! `_CHANGE_TYPE` / `_CHANGE_TIMESTAMP` pseudo-columns.

mod client;
mod store;

pub use client::new_bigquery_client;
pub use store::BigQueryTableStore;
