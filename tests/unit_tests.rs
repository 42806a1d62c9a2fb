use bq_stream_sync::sync::SyncLoopConfig;
use bq_stream_sync::{BigQueryOpts, PubSubOpts, SyncOpts};
use chrono::{NaiveDate, TimeZone, Utc};
use std::time::Duration;
use sync_core::SyncError;

fn base_opts() -> SyncOpts {
    SyncOpts {
        table_prefix: "events_intraday".to_string(),
        table_date: "20240601".to_string(),
        poll_interval: 5,
        sync_start: Some("2024-06-01T00:00:00+00:00".to_string()),
    }
}

#[test]
fn test_opts_creation() {
    let bigquery = BigQueryOpts {
        gcp_project: "my-project".to_string(),
        bq_dataset: "analytics".to_string(),
    };
    let pubsub = PubSubOpts {
        topic: "analytics-events".to_string(),
    };

    assert_eq!(bigquery.gcp_project, "my-project");
    assert_eq!(bigquery.bq_dataset, "analytics");
    assert_eq!(pubsub.topic, "analytics-events");
}

#[test]
fn test_config_from_valid_opts() {
    let config = SyncLoopConfig::from_opts(&base_opts()).unwrap();

    assert_eq!(config.table_prefix, "events_intraday");
    assert_eq!(
        config.table_date,
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    );
    assert_eq!(config.poll_interval, Duration::from_secs(5));
    assert_eq!(
        config.sync_start,
        Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_config_without_sync_start_is_open_ended() {
    let opts = SyncOpts {
        sync_start: None,
        ..base_opts()
    };
    let config = SyncLoopConfig::from_opts(&opts).unwrap();
    assert_eq!(config.sync_start, None);
}

#[test]
fn test_config_rejects_malformed_date() {
    let opts = SyncOpts {
        table_date: "2024-06-01".to_string(),
        ..base_opts()
    };
    let err = SyncLoopConfig::from_opts(&opts).unwrap_err();
    assert!(matches!(err, SyncError::Configuration(_)));
}

#[test]
fn test_config_rejects_unsafe_prefix() {
    for prefix in ["", "events.intraday", "events`; DROP TABLE x; --"] {
        let opts = SyncOpts {
            table_prefix: prefix.to_string(),
            ..base_opts()
        };
        let err = SyncLoopConfig::from_opts(&opts).unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)), "prefix: {prefix:?}");
    }
}

#[test]
fn test_config_rejects_zero_poll_interval() {
    let opts = SyncOpts {
        poll_interval: 0,
        ..base_opts()
    };
    let err = SyncLoopConfig::from_opts(&opts).unwrap_err();
    assert!(matches!(err, SyncError::Configuration(_)));
}

#[test]
fn test_config_rejects_malformed_sync_start() {
    let opts = SyncOpts {
        sync_start: Some("June 1st 2024".to_string()),
        ..base_opts()
    };
    let err = SyncLoopConfig::from_opts(&opts).unwrap_err();
    assert!(matches!(err, SyncError::Configuration(_)));
}
