//! Companion subscriber: drains the published events and logs them.
//!
//! Messages are acknowledged only after successful local processing;
//! unacknowledged messages are redelivered by Pub/Sub, which is what
//! makes the overall pipeline at-least-once rather than exactly-once.

use anyhow::Context;
use gcloud_pubsub::client::{Client, ClientConfig};
use sync_core::OutboundEvent;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Listen on `subscription_id` until `cancel` fires.
///
/// The streaming pull is governed by the cancellation token: on
/// cancellation the SDK flushes in-flight callbacks and the call returns
/// cleanly.
pub async fn run_subscribe(
    project_id: &str,
    subscription_id: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
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

    let subscription = client.subscription(subscription_id);
    if !subscription
        .exists(None)
        .await
        .context("failed to check subscription")?
    {
        anyhow::bail!(
            "subscription '{subscription_id}' does not exist in project '{project_id}'"
        );
    }

    info!(subscription = subscription_id, "listening for messages");

    subscription
        .receive(
            |message, _cancel| async move {
                match OutboundEvent::from_json(&message.message.data) {
                    Ok(event) => {
                        info!(
                            user_id = %event.user_id,
                            event_timestamp = event.event_timestamp,
                            "received event"
                        );
                        if let Err(e) = message.ack().await {
                            warn!(error = %e, "failed to ack message");
                        }
                    }
                    Err(e) => {
                        // Left unacked so the transport redelivers it.
                        warn!(error = %e, "failed to decode message");
                    }
                }
            },
            cancel,
            None,
        )
        .await
        .context("streaming pull failed")?;

    info!("subscriber shut down cleanly");
    Ok(())
}
