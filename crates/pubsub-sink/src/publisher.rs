//! Batch publication of change records as discrete outbound events.

use sync_core::{ChangeRecord, EventTransport, OutboundEvent};
use tracing::warn;

/// Identity of a record whose submission was rejected, with enough detail
/// for manual replay.
#[derive(Debug, Clone)]
pub struct PublishFailure {
    pub user_id: String,
    pub event_timestamp: i64,
    pub reason: String,
}

/// Outcome of publishing one batch.
///
/// `accepted == submitted` when nothing was rejected; a shortfall is a
/// partial failure, not a batch error.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub submitted: usize,
    pub accepted: usize,
    pub failures: Vec<PublishFailure>,
}

impl PublishReport {
    pub fn is_partial(&self) -> bool {
        self.accepted < self.submitted
    }
}

/// Publishes each captured row as one event on the transport.
///
/// The publisher owns the outbound event only for the duration of the
/// publish call; nothing is retained or re-submitted after the call
/// returns.
pub struct EventPublisher<T> {
    transport: T,
}

impl<T: EventTransport> EventPublisher<T> {
    pub fn new(transport: T) -> EventPublisher<T> {
        EventPublisher { transport }
    }

    /// Build one [`OutboundEvent`] per record and submit it. A rejected
    /// submission is tallied and the batch continues.
    pub async fn publish(&self, records: &[ChangeRecord]) -> PublishReport {
        let mut report = PublishReport {
            submitted: records.len(),
            ..PublishReport::default()
        };

        for record in records {
            let event = OutboundEvent::from(record);
            let result = match event.to_json() {
                Ok(payload) => self.transport.submit(payload).await,
                Err(e) => Err(sync_core::SyncError::Publish(format!(
                    "failed to encode event: {e}"
                ))),
            };
            match result {
                Ok(()) => report.accepted += 1,
                Err(e) => report.failures.push(PublishFailure {
                    user_id: record.user_id.clone(),
                    event_timestamp: record.event_timestamp,
                    reason: e.to_string(),
                }),
            }
        }

        report
    }

    /// Release the transport's underlying connection.
    pub async fn shutdown(&self) {
        if let Err(e) = self.transport.shutdown().await {
            warn!(error = %e, "transport shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use sync_core::{ChangeType, SyncError};

    /// Transport that records payloads and rejects the first `reject`
    /// submissions.
    #[derive(Default)]
    struct RecordingTransport {
        reject: Mutex<usize>,
        payloads: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl EventTransport for RecordingTransport {
        async fn submit(&self, payload: Vec<u8>) -> Result<(), SyncError> {
            let mut reject = self.reject.lock().unwrap();
            if *reject > 0 {
                *reject -= 1;
                return Err(SyncError::Publish("injected rejection".into()));
            }
            self.payloads.lock().unwrap().push(payload);
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), SyncError> {
            Ok(())
        }
    }

    fn record(n: i64) -> ChangeRecord {
        ChangeRecord {
            event_timestamp: n,
            user_id: format!("user-{n}"),
            device_category: "mobile".to_string(),
            geo_country: "us".to_string(),
            purchase_revenue: 10.0,
            change_type: ChangeType::Insert,
            change_timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn all_accepted_when_transport_accepts_all() {
        let publisher = EventPublisher::new(RecordingTransport::default());
        let records: Vec<_> = (0..5).map(record).collect();

        let report = publisher.publish(&records).await;
        assert_eq!(report.submitted, 5);
        assert_eq!(report.accepted, 5);
        assert!(!report.is_partial());
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn rejections_reduce_accepted_count_without_aborting_the_batch() {
        let transport = RecordingTransport {
            reject: Mutex::new(2),
            ..RecordingTransport::default()
        };
        let publisher = EventPublisher::new(transport);
        let records: Vec<_> = (0..5).map(record).collect();

        let report = publisher.publish(&records).await;
        assert_eq!(report.submitted, 5);
        assert_eq!(report.accepted, 3);
        assert!(report.is_partial());
        assert_eq!(report.failures.len(), 2);
        // The failed records stay identifiable for manual replay.
        assert_eq!(report.failures[0].user_id, "user-0");
        assert_eq!(report.failures[0].event_timestamp, 0);
        assert_eq!(report.failures[1].user_id, "user-1");
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let publisher = EventPublisher::new(RecordingTransport::default());
        let report = publisher.publish(&[]).await;
        assert_eq!(report.submitted, 0);
        assert_eq!(report.accepted, 0);
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn payloads_are_the_canonical_wire_format() {
        let publisher = EventPublisher::new(RecordingTransport::default());
        let records = vec![record(7)];
        publisher.publish(&records).await;

        let payloads = publisher.transport.payloads.lock().unwrap();
        let event = OutboundEvent::from_json(&payloads[0]).unwrap();
        assert_eq!(event.user_id, "user-7");
        assert_eq!(event.event_timestamp, 7);
    }
}
