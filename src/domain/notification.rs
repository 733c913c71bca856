//! Notification payloads and per-attempt delivery outcomes.
//!
//! [`NotificationPayload`] is the JSON message published to the queue for
//! the device owner. [`format_chat_alert`] renders the text pushed to each
//! linked chat. Outcomes record what happened to every attempt so callers
//! can decide how to surface partial failures.

use serde::Serialize;

use super::{Alert, ChatId, DeviceSerial, Owner};

/// Human label for an active sensor.
pub const STATE_ACTIVE_LABEL: &str = "Activado";

/// Human label for an inactive sensor.
pub const STATE_INACTIVE_LABEL: &str = "Desactivado";

/// Queue message built from an alert and its device owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    /// Owner account ID.
    #[serde(rename = "user_id")]
    pub owner_id: i64,
    /// Owner username.
    pub username: String,
    /// Owner email.
    pub email: String,
    /// Sensor kind identifier.
    #[serde(rename = "sensor_type")]
    pub sensor_kind: String,
    /// Raw sensor state.
    #[serde(rename = "estado")]
    pub state: i32,
    /// Activation timestamp.
    #[serde(rename = "activacion")]
    pub activated_at: String,
    /// Deactivation timestamp.
    #[serde(rename = "desactivacion")]
    pub deactivated_at: String,
    /// Device serial.
    #[serde(rename = "numero_serie")]
    pub serial: DeviceSerial,
}

impl NotificationPayload {
    /// Builds the owner notification for `alert`.
    #[must_use]
    pub fn new(alert: &Alert, owner: &Owner) -> Self {
        Self {
            owner_id: owner.id,
            username: owner.username.clone(),
            email: owner.email.clone(),
            sensor_kind: alert.sensor_kind.clone(),
            state: alert.state,
            activated_at: alert.activated_at.clone(),
            deactivated_at: alert.deactivated_at.clone(),
            serial: alert.serial.clone(),
        }
    }
}

/// Returns the human-readable state label.
#[must_use]
pub const fn state_label(state: i32) -> &'static str {
    if state == 1 {
        STATE_ACTIVE_LABEL
    } else {
        STATE_INACTIVE_LABEL
    }
}

/// Renders the message pushed to every chat linked to the alerting device.
#[must_use]
pub fn format_chat_alert(alert: &Alert) -> String {
    format!(
        "🚨 *ALERTA DE SENSOR* 🚨\n\nSensor: {}\nEstado: {}\nActivación: {}\nDesactivación: {}",
        alert.sensor_kind,
        state_label(alert.state),
        alert.activated_at,
        alert.deactivated_at
    )
}

/// Result of one chat delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The chat platform accepted the message.
    Delivered,
    /// The attempt failed; the reason is kept for observability.
    Failed(String),
}

/// Result of the owner queue publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum QueueOutcome {
    /// The queue acknowledged the message.
    Published,
    /// Publishing failed.
    Failed(String),
    /// The device has no owner; nothing was published.
    SkippedNoOwner,
}

/// One attempted chat delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatDelivery {
    /// Target chat.
    pub chat_id: ChatId,
    /// What happened.
    pub outcome: DeliveryOutcome,
}

/// Aggregated outcome of one alert dispatch.
///
/// `attempted_chats` counts attempts, not confirmed deliveries; inspect
/// `deliveries` to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    /// Number of chat deliveries attempted.
    pub attempted_chats: usize,
    /// Owner queue outcome.
    pub queue: QueueOutcome,
    /// Per-chat outcomes, in link order.
    pub deliveries: Vec<ChatDelivery>,
}

impl DispatchResult {
    /// Number of chat deliveries the platform accepted.
    #[must_use]
    pub fn delivered_chats(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| d.outcome == DeliveryOutcome::Delivered)
            .count()
    }
}
