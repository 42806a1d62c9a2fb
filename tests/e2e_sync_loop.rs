//! End-to-end sync loop tests against the in-memory store and transport.

use std::time::Duration;

use bq_stream_sync::sync::{SyncLoop, SyncLoopConfig};
use bq_stream_sync::testing::{MemoryTableStore, MemoryTransport};
use chrono::{NaiveDate, Utc};
use sync_core::{ChangeRecord, ChangeType, TrackedTable};
use tokio_util::sync::CancellationToken;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Row carrying a monotonic identifier so duplicates and drops are
/// detectable across the rotation boundary.
fn record(n: i64) -> ChangeRecord {
    ChangeRecord {
        event_timestamp: n,
        user_id: format!("row-{n}"),
        device_category: "mobile".to_string(),
        geo_country: "us".to_string(),
        purchase_revenue: n as f64,
        change_type: ChangeType::Insert,
        change_timestamp: Utc::now(),
    }
}

fn fast_config(table_date: NaiveDate) -> SyncLoopConfig {
    SyncLoopConfig {
        table_prefix: "events_intraday".to_string(),
        table_date,
        poll_interval: Duration::from_millis(20),
        sync_start: Some(Utc::now() - chrono::Duration::hours(1)),
        initial_backoff: Duration::from_millis(20),
        max_backoff: Duration::from_millis(100),
    }
}

async fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < limit {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn rotation_neither_drops_nor_duplicates_rows() {
    let store = MemoryTableStore::new();
    let transport = MemoryTransport::new();

    let day_one = TrackedTable::new("events_intraday", date(2024, 6, 1));
    store.create_table(&day_one);
    for n in 1..=3 {
        store.append(&day_one, record(n));
    }

    let sync_loop = SyncLoop::new(store.clone(), transport.clone(), fast_config(date(2024, 6, 1)));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { sync_loop.run(cancel).await }
    });

    {
        let transport = transport.clone();
        assert!(
            wait_until(Duration::from_secs(5), move || transport.accepted_count() >= 3).await,
            "pre-rotation rows were not published"
        );
    }

    // Same-day rotation: the intraday table vanishes, its successor
    // appears, and new rows land in the successor.
    let day_two = store.rotate(&day_one);
    for n in 4..=5 {
        store.append(&day_two, record(n));
    }

    {
        let transport = transport.clone();
        assert!(
            wait_until(Duration::from_secs(5), move || transport.accepted_count() >= 5).await,
            "post-rotation rows were not published"
        );
    }

    cancel.cancel();
    handle.await.unwrap().unwrap();

    let mut user_ids: Vec<String> = transport
        .accepted_events()
        .into_iter()
        .map(|e| e.user_id)
        .collect();
    user_ids.sort();
    assert_eq!(
        user_ids,
        vec!["row-1", "row-2", "row-3", "row-4", "row-5"],
        "every row must be published exactly once across the rotation"
    );
    assert_eq!(transport.shutdown_count(), 1);
}

#[tokio::test]
async fn double_miss_is_fatal_and_exits_the_loop() {
    // No tables at all: neither the tracked date nor its successor.
    let store = MemoryTableStore::new();
    let transport = MemoryTransport::new();

    let sync_loop = SyncLoop::new(store, transport, fast_config(date(2024, 6, 1)));
    let err = sync_loop
        .run(CancellationToken::new())
        .await
        .expect_err("resolution against a doubly-missing table must be fatal");
    assert!(
        format!("{err:#}").contains("exactly one day"),
        "diagnostic should name the unmet rotation assumption: {err:#}"
    );
}

#[tokio::test]
async fn transient_fetch_failures_retry_without_losing_rows() {
    let store = MemoryTableStore::new();
    let transport = MemoryTransport::new();

    let table = TrackedTable::new("events_intraday", date(2024, 6, 1));
    store.create_table(&table);
    for n in 1..=3 {
        store.append(&table, record(n));
    }
    store.fail_next_fetch(2);

    let sync_loop = SyncLoop::new(store.clone(), transport.clone(), fast_config(date(2024, 6, 1)));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { sync_loop.run(cancel).await }
    });

    {
        let transport = transport.clone();
        assert!(
            wait_until(Duration::from_secs(5), move || transport.accepted_count() >= 3).await,
            "rows must survive transient fetch failures"
        );
    }

    cancel.cancel();
    handle.await.unwrap().unwrap();
    assert_eq!(transport.accepted_count(), 3);
}

#[tokio::test]
async fn transient_resolution_failures_retry_without_advancing_the_date() {
    let store = MemoryTableStore::new();
    let transport = MemoryTransport::new();

    let table = TrackedTable::new("events_intraday", date(2024, 6, 1));
    store.create_table(&table);
    store.append(&table, record(1));
    store.fail_next_exists(2);

    let sync_loop = SyncLoop::new(store.clone(), transport.clone(), fast_config(date(2024, 6, 1)));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { sync_loop.run(cancel).await }
    });

    {
        let transport = transport.clone();
        assert!(
            wait_until(Duration::from_secs(5), move || transport.accepted_count() >= 1).await,
            "the loop must recover once the metadata service does"
        );
    }

    cancel.cancel();
    handle.await.unwrap().unwrap();

    // Still reading the original table: resolution never rotated.
    assert_eq!(transport.accepted_events()[0].user_id, "row-1");
}

#[tokio::test]
async fn partial_publish_failure_does_not_stall_the_loop() {
    let store = MemoryTableStore::new();
    let transport = MemoryTransport::new();

    let table = TrackedTable::new("events_intraday", date(2024, 6, 1));
    store.create_table(&table);
    for n in 1..=3 {
        store.append(&table, record(n));
    }
    transport.reject_next(1);

    let sync_loop = SyncLoop::new(store.clone(), transport.clone(), fast_config(date(2024, 6, 1)));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { sync_loop.run(cancel).await }
    });

    {
        let transport = transport.clone();
        assert!(
            wait_until(Duration::from_secs(5), move || transport.accepted_count() >= 2).await,
            "accepted rows must still be published"
        );
    }

    // The loop keeps ingesting new windows after the rejection.
    store.append(&table, record(4));
    {
        let transport = transport.clone();
        assert!(
            wait_until(Duration::from_secs(5), move || {
                transport
                    .accepted_events()
                    .iter()
                    .any(|e| e.user_id == "row-4")
            })
            .await,
            "the loop must keep advancing after a partial publish failure"
        );
    }

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn empty_windows_publish_nothing() {
    let store = MemoryTableStore::new();
    let transport = MemoryTransport::new();
    store.create_table(&TrackedTable::new("events_intraday", date(2024, 6, 1)));

    let sync_loop = SyncLoop::new(store.clone(), transport.clone(), fast_config(date(2024, 6, 1)));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { sync_loop.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(transport.accepted_count(), 0);
}
