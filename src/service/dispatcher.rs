//! Notification dispatcher: persists, publishes and fans out one alert.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::channels::{ChatSender, QueuePublisher};
use crate::domain::{
    Alert, ChatDelivery, ChatId, DeliveryOutcome, DispatchResult, NewReading, NotificationPayload,
    Owner, QueueOutcome, format_chat_alert,
};
use crate::error::GatewayError;
use crate::persistence::{DeviceDirectory, ReadingStore};

/// Orchestration layer for alert delivery.
///
/// Stateless coordinator over four capabilities. Every dispatch follows
/// the pattern: resolve device → persist reading (if the sensor kind is
/// tracked) → publish owner notification → push to every linked chat →
/// return the aggregated outcome.
///
/// Resolution and storage failures abort the dispatch. Queue and chat
/// failures are recorded in the [`DispatchResult`] and never abort it.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    directory: Arc<dyn DeviceDirectory>,
    readings: Arc<dyn ReadingStore>,
    queue: Arc<dyn QueuePublisher>,
    chat: Arc<dyn ChatSender>,
    persisted_kinds: Arc<HashSet<String>>,
}

impl NotificationDispatcher {
    /// Creates a new `NotificationDispatcher`.
    ///
    /// Readings are stored only for sensor kinds in `persisted_kinds`.
    #[must_use]
    pub fn new(
        directory: Arc<dyn DeviceDirectory>,
        readings: Arc<dyn ReadingStore>,
        queue: Arc<dyn QueuePublisher>,
        chat: Arc<dyn ChatSender>,
        persisted_kinds: HashSet<String>,
    ) -> Self {
        Self {
            directory,
            readings,
            queue,
            chat,
            persisted_kinds: Arc::new(persisted_kinds),
        }
    }

    /// Returns `true` if readings of this sensor kind are persisted.
    #[must_use]
    pub fn requires_persistence(&self, sensor_kind: &str) -> bool {
        self.persisted_kinds.contains(sensor_kind)
    }

    /// Processes one validated alert end to end.
    ///
    /// The returned `attempted_chats` counts attempts, not confirmed
    /// deliveries.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DispatchDeviceNotFound`] if the serial has
    /// no device (nothing is stored or sent), or
    /// [`GatewayError::PersistenceError`] if a lookup or the reading save
    /// fails (no notification is attempted after a failed save).
    pub async fn dispatch(&self, alert: &Alert) -> Result<DispatchResult, GatewayError> {
        let serial = &alert.serial;

        if self.directory.get_device(serial).await?.is_none() {
            warn!(%serial, sensor = %alert.sensor_kind, "alert for unknown device");
            return Err(GatewayError::DispatchDeviceNotFound(serial.to_string()));
        }

        if self.requires_persistence(&alert.sensor_kind) {
            let reading = self
                .readings
                .save_reading(NewReading::from(alert))
                .await
                .inspect_err(|e| error!(%serial, error = %e, "failed to store reading"))?;
            debug!(%serial, reading_id = reading.id, "reading stored");
        }

        let queue = match self.directory.get_owner(serial).await? {
            Some(owner) => self.publish_to_owner(alert, &owner).await,
            None => {
                info!(%serial, "device has no owner; skipping queue notification");
                QueueOutcome::SkippedNoOwner
            }
        };

        let chats = self.directory.get_linked_chats(serial).await?;
        let text = format_chat_alert(alert);
        let deliveries = join_all(
            chats
                .iter()
                .map(|&chat_id| self.deliver_to_chat(chat_id, &text)),
        )
        .await;

        let result = DispatchResult {
            attempted_chats: chats.len(),
            queue,
            deliveries,
        };
        info!(
            %serial,
            sensor = %alert.sensor_kind,
            attempted = result.attempted_chats,
            delivered = result.delivered_chats(),
            "alert dispatched"
        );
        Ok(result)
    }

    async fn publish_to_owner(&self, alert: &Alert, owner: &Owner) -> QueueOutcome {
        let payload = NotificationPayload::new(alert, owner);
        match self.queue.publish(&payload).await {
            Ok(()) => {
                debug!(serial = %alert.serial, owner = %owner.username, "owner notification queued");
                QueueOutcome::Published
            }
            Err(e) => {
                warn!(serial = %alert.serial, owner_id = owner.id, error = %e, "failed to queue owner notification");
                QueueOutcome::Failed(e.to_string())
            }
        }
    }

    async fn deliver_to_chat(&self, chat_id: ChatId, text: &str) -> ChatDelivery {
        let outcome = match self.chat.send_text(chat_id, text).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                warn!(chat_id, error = %e, "failed to deliver alert to chat");
                DeliveryOutcome::Failed(e.to_string())
            }
        };
        ChatDelivery { chat_id, outcome }
    }
}
