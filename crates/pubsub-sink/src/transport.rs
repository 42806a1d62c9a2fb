//! Google Cloud Pub/Sub transport.

use anyhow::Context;
use async_trait::async_trait;
use gcloud_googleapis::pubsub::v1::PubsubMessage;
use gcloud_pubsub::client::{Client, ClientConfig};
use gcloud_pubsub::publisher::Publisher;
use sync_core::{EventTransport, SyncError};
use tokio::sync::Mutex;
use tracing::info;

/// Transport over one Pub/Sub topic publisher.
///
/// Each submission is handed to the publisher and awaited for the
/// transport's acknowledgment; end-to-end delivery to subscribers is
/// Pub/Sub's redelivery contract, not this type's.
pub struct PubSubTransport {
    // The SDK publisher requires &mut for shutdown.
    publisher: Mutex<Publisher>,
    topic_id: String,
}

impl PubSubTransport {
    /// Connect to the topic, verifying it exists before the first publish.
    ///
    /// Credentials follow the standard resolution order; the
    /// `PUBSUB_EMULATOR_HOST` environment variable short-circuits auth
    /// entirely for local development.
    pub async fn connect(project_id: &str, topic_id: &str) -> anyhow::Result<PubSubTransport> {
        let config = ClientConfig {
            project_id: Some(project_id.to_string()),
            ..Default::default()
        };
        let config = if std::env::var("PUBSUB_EMULATOR_HOST").is_ok() {
            info!("using Pub/Sub emulator");
            config
        } else {
            config
                .with_auth()
                .await
                .context("failed to resolve Pub/Sub credentials")?
        };

        let client = Client::new(config)
            .await
            .context("failed to create Pub/Sub client")?;

        let topic = client.topic(topic_id);
        if !topic
            .exists(None)
            .await
            .with_context(|| format!("failed to check Pub/Sub topic '{topic_id}'"))?
        {
            anyhow::bail!("Pub/Sub topic '{topic_id}' does not exist in project '{project_id}'");
        }

        info!(topic = topic_id, "connected to Pub/Sub topic");

        Ok(PubSubTransport {
            publisher: Mutex::new(topic.new_publisher(None)),
            topic_id: topic_id.to_string(),
        })
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }
}

#[async_trait]
impl EventTransport for PubSubTransport {
    async fn submit(&self, payload: Vec<u8>) -> Result<(), SyncError> {
        let message = PubsubMessage {
            data: payload,
            ..Default::default()
        };
        // publish() only enqueues; the awaiter resolves once the
        // publisher has an acknowledgment for this message.
        let awaiter = self.publisher.lock().await.publish(message).await;
        awaiter
            .get()
            .await
            .map(|_message_id| ())
            .map_err(|e| SyncError::Publish(format!("topic {}: {e}", self.topic_id)))
    }

    async fn shutdown(&self) -> Result<(), SyncError> {
        self.publisher.lock().await.shutdown().await;
        info!(topic = %self.topic_id, "Pub/Sub publisher shut down");
        Ok(())
    }
}
