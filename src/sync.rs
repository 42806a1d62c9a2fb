//! The change-tracking sync loop.
//!
//! The loop owns the current [`SyncWindow`] and the current
//! [`TrackedTable`] and is their only writer. Each iteration runs the
//! phases strictly in order: resolve the physical table (rotating to the
//! successor when the tracked one has been deleted), fetch the changes
//! appended within the window, publish them, then advance the window so
//! the previous end becomes the next start, and sleep for the poll
//! interval.
//!
//! Only a configuration error (including the double-miss rotation case)
//! terminates the loop; transient failures retry with bounded backoff at
//! the phase that hit them, without advancing the window or the tracked
//! date.

use std::time::Duration;

use anyhow::Context;
use bq_stream_sync_pubsub_sink::EventPublisher;
use chrono::{DateTime, NaiveDate, Utc};
use sync_core::{
    resolve_table, ChangeRecord, EventTransport, SyncError, SyncWindow, TableStore, TrackedTable,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{BigQueryOpts, PubSubOpts, SyncOpts};

/// Validated configuration for one loop instance.
#[derive(Debug, Clone)]
pub struct SyncLoopConfig {
    pub table_prefix: String,
    pub table_date: NaiveDate,
    pub poll_interval: Duration,
    pub sync_start: Option<DateTime<Utc>>,
    /// First retry delay for transient failures; doubles per attempt.
    pub initial_backoff: Duration,
    /// Ceiling for the doubling backoff.
    pub max_backoff: Duration,
}

impl SyncLoopConfig {
    pub fn from_opts(opts: &SyncOpts) -> Result<SyncLoopConfig, SyncError> {
        if opts.table_prefix.is_empty()
            || !opts
                .table_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(SyncError::Configuration(format!(
                "invalid --table-prefix '{}': expected ASCII letters, digits and underscores",
                opts.table_prefix
            )));
        }

        let table_date = NaiveDate::parse_from_str(&opts.table_date, "%Y%m%d").map_err(|e| {
            SyncError::Configuration(format!(
                "invalid --table-date '{}': expected YYYYMMDD ({e})",
                opts.table_date
            ))
        })?;

        if opts.poll_interval == 0 {
            return Err(SyncError::Configuration(
                "--poll-interval must be at least 1 second".to_string(),
            ));
        }

        let sync_start = opts
            .sync_start
            .as_deref()
            .map(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(|e| {
                        SyncError::Configuration(format!(
                            "invalid --sync-start '{s}': expected an RFC 3339 timestamp ({e})"
                        ))
                    })
            })
            .transpose()?;

        Ok(SyncLoopConfig {
            table_prefix: opts.table_prefix.clone(),
            table_date,
            poll_interval: Duration::from_secs(opts.poll_interval),
            sync_start,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        })
    }
}

/// Outcome of the fetch phase.
enum Fetched {
    Records(Vec<ChangeRecord>),
    /// The tracked table was deleted between resolution and the range
    /// query; re-resolve against the same window.
    TableRotated,
    Cancelled,
}

pub struct SyncLoop<S, T> {
    store: S,
    publisher: EventPublisher<T>,
    config: SyncLoopConfig,
}

impl<S: TableStore, T: EventTransport> SyncLoop<S, T> {
    pub fn new(store: S, transport: T, config: SyncLoopConfig) -> SyncLoop<S, T> {
        SyncLoop {
            store,
            publisher: EventPublisher::new(transport),
            config,
        }
    }

    /// Run until `cancel` fires or resolution fails fatally.
    pub async fn run(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut window = SyncWindow::initial(self.config.sync_start, Utc::now())
            .context("invalid initial sync window")?;
        let mut table =
            TrackedTable::new(self.config.table_prefix.as_str(), self.config.table_date);

        info!(table = %table, window = %window, "starting sync loop");

        while !cancel.is_cancelled() {
            table = match self.resolve_with_retry(&table, &cancel).await? {
                Some(resolved) => resolved,
                None => break,
            };

            let records = match self.fetch_with_retry(&table, &window, &cancel).await? {
                Fetched::Records(records) => records,
                Fetched::TableRotated => continue,
                Fetched::Cancelled => break,
            };

            // Partial publish failure is logged but does not stall the
            // ingestion of future windows.
            let report = self.publisher.publish(&records).await;
            for failure in &report.failures {
                warn!(
                    user_id = %failure.user_id,
                    event_timestamp = failure.event_timestamp,
                    reason = %failure.reason,
                    "event submission rejected"
                );
            }
            info!(
                table = %table,
                window = %window,
                fetched = records.len(),
                accepted = report.accepted,
                "sync iteration complete"
            );

            // The previous end becomes the next start; the new end is
            // captured before the query that will read it is issued.
            window = window.advance(Utc::now());

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        info!("sync loop stopped");
        self.publisher.shutdown().await;
        Ok(())
    }

    /// Resolution phase. Rotation is handled inside [`resolve_table`];
    /// transient store failures retry here without advancing the date.
    /// Returns `None` on cancellation.
    async fn resolve_with_retry(
        &self,
        table: &TrackedTable,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<TrackedTable>> {
        let mut backoff = self.config.initial_backoff;
        let mut attempt = 1u32;
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            match resolve_table(&self.store, table.prefix(), table.date()).await {
                Ok(resolved) => {
                    if resolved.date() != table.date() {
                        info!(from = %table, to = %resolved, "rotated to successor table");
                    }
                    return Ok(Some(resolved));
                }
                Err(e) if e.is_fatal() => {
                    return Err(anyhow::Error::new(e).context("table resolution failed"));
                }
                Err(e) => {
                    warn!(
                        attempt,
                        backoff_secs = backoff.as_secs(),
                        error = %e,
                        "table resolution failed; retrying"
                    );
                    if !sleep_backoff(cancel, &mut backoff, self.config.max_backoff).await {
                        return Ok(None);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Fetch phase. The window is NOT advanced on failure; a successful
    /// retry re-reads the same `[start, end)` range.
    async fn fetch_with_retry(
        &self,
        table: &TrackedTable,
        window: &SyncWindow,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Fetched> {
        let mut backoff = self.config.initial_backoff;
        let mut attempt = 1u32;
        loop {
            if cancel.is_cancelled() {
                return Ok(Fetched::Cancelled);
            }
            match self.fetch_window(table, window).await {
                Ok(records) => return Ok(Fetched::Records(records)),
                Err(SyncError::TableNotFound(id)) => {
                    info!(table = %id, "tracked table disappeared mid-iteration; re-resolving");
                    return Ok(Fetched::TableRotated);
                }
                Err(e) if e.is_fatal() => {
                    return Err(anyhow::Error::new(e).context("change-feed fetch failed"));
                }
                Err(e) => {
                    warn!(
                        attempt,
                        backoff_secs = backoff.as_secs(),
                        error = %e,
                        "change-feed fetch failed; retrying without advancing the window"
                    );
                    if !sleep_backoff(cancel, &mut backoff, self.config.max_backoff).await {
                        return Ok(Fetched::Cancelled);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Drain one range query into memory so publishing starts only after
    /// a complete, successful read.
    async fn fetch_window(
        &self,
        table: &TrackedTable,
        window: &SyncWindow,
    ) -> Result<Vec<ChangeRecord>, SyncError> {
        let mut stream = self.store.fetch_changes(table, window).await?;
        let mut records = Vec::new();
        while let Some(row) = stream.next().await {
            records.push(row?);
        }
        Ok(records)
    }
}

/// Sleep for the current backoff and double it up to `max`. Returns
/// `false` when the sleep was cut short by cancellation.
async fn sleep_backoff(
    cancel: &CancellationToken,
    backoff: &mut Duration,
    max: Duration,
) -> bool {
    let wait = *backoff;
    *backoff = (*backoff * 2).min(max);
    tokio::select! {
        _ = tokio::time::sleep(wait) => true,
        _ = cancel.cancelled() => false,
    }
}

/// Wire the production clients together and run the loop.
pub async fn run_sync(
    bigquery_opts: BigQueryOpts,
    sync_opts: SyncOpts,
    pubsub_opts: PubSubOpts,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let config = SyncLoopConfig::from_opts(&sync_opts)?;

    let client = crate::bigquery::new_bigquery_client().await?;
    let store = crate::bigquery::BigQueryTableStore::new(
        client,
        bigquery_opts.gcp_project.as_str(),
        bigquery_opts.bq_dataset.as_str(),
    );
    let transport =
        crate::pubsub::PubSubTransport::connect(&bigquery_opts.gcp_project, &pubsub_opts.topic)
            .await?;

    SyncLoop::new(store, transport, config).run(cancel).await
}
