//! Inbound sensor alert: wire payload and validated domain value.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DeviceSerial;
use crate::error::GatewayError;

/// Alert body as posted by a field device.
///
/// Every field is optional on the wire; required fields are enforced when
/// converting into an [`Alert`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AlertPayload {
    /// Device serial number.
    #[serde(rename = "numeroSerie", default)]
    pub serial: String,
    /// Sensor kind identifier (e.g. `"KY_026"`).
    #[serde(rename = "sensor", default)]
    pub sensor: String,
    /// Activation timestamp, as reported by the device.
    #[serde(rename = "fecha_activacion", default)]
    pub activated_at: String,
    /// Deactivation timestamp, as reported by the device.
    #[serde(rename = "fecha_desactivacion", default)]
    pub deactivated_at: String,
    /// `1` when the sensor is active, `0` otherwise.
    #[serde(rename = "estado", default)]
    pub state: i32,
}

/// Validated alert, constructed once per inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Serial of the reporting device.
    pub serial: DeviceSerial,
    /// Sensor kind identifier.
    pub sensor_kind: String,
    /// Activation timestamp as sent by the device.
    pub activated_at: String,
    /// Deactivation timestamp as sent by the device.
    pub deactivated_at: String,
    /// Raw sensor state.
    pub state: i32,
}

impl Alert {
    /// Returns `true` when the sensor reports the active state.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state == 1
    }
}

impl TryFrom<AlertPayload> for Alert {
    type Error = GatewayError;

    fn try_from(payload: AlertPayload) -> Result<Self, Self::Error> {
        let serial = DeviceSerial::new(&payload.serial);
        if serial.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "missing numeroSerie".to_string(),
            ));
        }
        let sensor_kind = payload.sensor.trim().to_string();
        if sensor_kind.is_empty() {
            return Err(GatewayError::InvalidRequest("missing sensor".to_string()));
        }
        Ok(Self {
            serial,
            sensor_kind,
            activated_at: payload.activated_at,
            deactivated_at: payload.deactivated_at,
            state: payload.state,
        })
    }
}
