//! Directory and reading entities.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Alert, ChatId, DeviceSerial};

/// A registered field unit. Provisioned out of band; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Storage row ID.
    pub id: i64,
    /// Unique serial number.
    pub serial: DeviceSerial,
}

/// Account that owns a device. A device has zero or one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Owner {
    /// Account ID.
    pub id: i64,
    /// Account username.
    pub username: String,
    /// Account email.
    pub email: String,
}

/// Association between a chat endpoint and a device.
///
/// Append-only: duplicates are allowed and nothing deletes a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatLink {
    /// Linked chat endpoint.
    pub chat_id: ChatId,
    /// Linked device serial.
    pub serial: DeviceSerial,
    /// When the link was recorded.
    pub linked_at: DateTime<Utc>,
}

/// A persisted sensor observation. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reading {
    /// Insertion sequence; the highest ID is the latest reading.
    pub id: i64,
    /// Serial of the reporting device.
    pub serial: DeviceSerial,
    /// Activation timestamp as reported by the device.
    pub activated_at: String,
    /// Sensor state rendered as text (`"0"` / `"1"`).
    pub state: String,
}

/// Reading fields before the store assigns an ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReading {
    /// Serial of the reporting device.
    pub serial: DeviceSerial,
    /// Activation timestamp.
    pub activated_at: String,
    /// Sensor state as text.
    pub state: String,
}

impl From<&Alert> for NewReading {
    fn from(alert: &Alert) -> Self {
        Self {
            serial: alert.serial.clone(),
            activated_at: alert.activated_at.clone(),
            state: alert.state.to_string(),
        }
    }
}
