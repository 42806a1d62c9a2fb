//! Pub/Sub event sink for bq-stream-sync.
//!
//! [`EventPublisher`] turns captured change records into the canonical
//! JSON wire format and submits them one by one through an injected
//! [`sync_core::EventTransport`]; [`PubSubTransport`] is the production
//! transport over a Google Cloud Pub/Sub topic publisher.

mod publisher;
mod transport;

pub use publisher::{EventPublisher, PublishFailure, PublishReport};
pub use transport::PubSubTransport;
