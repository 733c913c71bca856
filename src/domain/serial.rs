//! Type-safe device serial number.
//!
//! [`DeviceSerial`] is a newtype around the serial string printed on a
//! field unit. It is the natural key of a device, so it is used for every
//! lookup in the directory and the reading store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Chat endpoint identifier on the messaging platform.
pub type ChatId = i64;

/// Serial number uniquely identifying a physical device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceSerial(String);

impl DeviceSerial {
    /// Wraps a serial, trimming surrounding whitespace.
    #[must_use]
    pub fn new(serial: impl AsRef<str>) -> Self {
        Self(serial.as_ref().trim().to_string())
    }

    /// Returns the serial as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the serial is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeviceSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceSerial {
    fn from(serial: &str) -> Self {
        Self::new(serial)
    }
}

impl From<String> for DeviceSerial {
    fn from(serial: String) -> Self {
        Self::new(serial)
    }
}
