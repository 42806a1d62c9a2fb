//! bq-stream-sync Library
//!
//! A service that incrementally captures newly appended rows from a
//! daily-rotated BigQuery analytics table and republishes each newly
//! observed row as a discrete event on a Google Cloud Pub/Sub topic.
//!
//! # Features
//!
//! - Change tracking: a monotonically advancing time window over the
//!   table's append feed, one bounded range query per iteration
//! - Rotation handling: when the tracked intraday table disappears, the
//!   loop transparently switches to the next day's table without losing
//!   or duplicating rows
//! - At-least-once publication: the window never advances past a window
//!   that has not been read successfully
//! - Companion tooling: a subscriber that drains and prints the published
//!   events, and a generator that appends synthetic rows for test and
//!   demo environments
//!
//! # CLI Usage
//!
//! ```bash
//! # Stream appended rows to a topic
//! bq-stream-sync sync \
//!   --gcp-project my-project --bq-dataset analytics \
//!   --table-prefix events_intraday --table-date 20240601 \
//!   --poll-interval 5 --sync-start 2024-06-01T00:00:00+00:00 \
//!   --topic analytics-events
//!
//! # Watch the published events
//! bq-stream-sync subscribe \
//!   --gcp-project my-project --subscription analytics-events-sub
//!
//! # Append synthetic rows to drive the loop
//! bq-stream-sync generate \
//!   --gcp-project my-project --bq-dataset analytics \
//!   --bq-table events_intraday_20240601 --interval 2 --total 100
//! ```

use clap::Parser;

pub mod generate;
pub mod subscribe;
pub mod sync;
pub mod testing;

// Re-export the source and sink crates for convenience
pub use bq_stream_sync_bigquery_source as bigquery;
pub use bq_stream_sync_pubsub_sink as pubsub;

#[derive(Parser, Clone)]
pub struct BigQueryOpts {
    /// Target GCP project
    #[arg(long, env = "GCP_PROJECT")]
    pub gcp_project: String,

    /// BigQuery dataset containing the tracked table
    #[arg(long, env = "BQ_DATASET")]
    pub bq_dataset: String,
}

#[derive(Parser, Clone)]
pub struct PubSubOpts {
    /// Destination Pub/Sub topic id
    #[arg(long, env = "PUBSUB_TOPIC")]
    pub topic: String,
}

#[derive(Parser, Clone)]
pub struct SyncOpts {
    /// Logical table-name prefix; physical tables are `{prefix}_{YYYYMMDD}`
    #[arg(long, default_value = "events_intraday")]
    pub table_prefix: String,

    /// Date of the table to start tracking, YYYYMMDD
    #[arg(long)]
    pub table_date: String,

    /// Seconds to sleep between sync iterations
    #[arg(long, default_value = "5")]
    pub poll_interval: u64,

    /// Timestamp to start syncing from (RFC 3339, timezone-aware).
    /// Omit to capture from the beginning of the feed's retention.
    #[arg(long)]
    pub sync_start: Option<String>,
}
