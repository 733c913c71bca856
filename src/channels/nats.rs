//! NATS JetStream notification queue.
//!
//! One long-lived [`async_nats::Client`] is connected at startup and shared
//! by every dispatch; the client reconnects on its own when the server
//! connection drops.

use std::time::Duration;

use async_nats::jetstream::{self, stream::Config as StreamConfig};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, instrument};

use super::QueuePublisher;
use crate::domain::NotificationPayload;
use crate::error::DeliveryError;

/// JetStream-backed [`QueuePublisher`].
///
/// The queue name is used both as the stream name and as its only subject.
#[derive(Debug, Clone)]
pub struct NatsQueue {
    jetstream: jetstream::Context,
    queue: String,
}

impl NatsQueue {
    /// Connects to NATS and makes sure the queue stream exists.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Queue`] if the connection or stream setup
    /// fails.
    pub async fn connect(url: &str, queue: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        info!(url = %url, timeout_ms = timeout.as_millis(), "connecting to NATS");

        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .map_err(|e| DeliveryError::Queue(format!("failed to connect to NATS: {e}")))?;

        let queue = Self {
            jetstream: jetstream::new(client),
            queue: queue.to_string(),
        };
        queue.ensure_stream().await?;

        info!(queue = %queue.queue, "notification queue ready");
        Ok(queue)
    }

    async fn ensure_stream(&self) -> Result<(), DeliveryError> {
        let config = StreamConfig {
            name: self.queue.clone(),
            subjects: vec![self.queue.clone()],
            description: Some("Owner notifications for sensor alerts".to_string()),
            ..Default::default()
        };

        self.jetstream
            .get_or_create_stream(config)
            .await
            .map_err(|e| DeliveryError::Queue(format!("failed to ensure stream: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl QueuePublisher for NatsQueue {
    #[instrument(skip(self, payload), fields(queue = %self.queue, serial = %payload.serial))]
    async fn publish(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let body = Bytes::from(serde_json::to_vec(payload)?);

        let ack = self
            .jetstream
            .publish(self.queue.clone(), body)
            .await
            .map_err(|e| DeliveryError::Queue(format!("failed to publish: {e}")))?;

        ack.await
            .map_err(|e| DeliveryError::Queue(format!("no acknowledgment: {e}")))?;
        Ok(())
    }
}
