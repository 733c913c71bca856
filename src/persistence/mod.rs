//! Persistence layer: device directory and sensor reading store.
//!
//! Both capabilities are object-safe async traits so the services can be
//! wired to PostgreSQL in production ([`postgres::PostgresStore`]) and to
//! in-memory doubles in tests ([`memory::MemoryDirectory`],
//! [`memory::MemoryReadingStore`]).

pub mod memory;
pub mod postgres;

pub use postgres::PostgresStore;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{ChatId, ChatLink, Device, DeviceSerial, NewReading, Owner, Reading};
use crate::error::GatewayError;

/// Resolves devices to their owner and linked chats; records new links.
///
/// "Nothing found" is a normal outcome and is reported as `None` or an
/// empty list. Only storage failures are errors.
#[async_trait]
pub trait DeviceDirectory: Send + Sync + fmt::Debug {
    /// Looks up a device by serial.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_device(&self, serial: &DeviceSerial) -> Result<Option<Device>, GatewayError>;

    /// Returns the owner of the device, or `None` if the device is unknown
    /// or unclaimed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_owner(&self, serial: &DeviceSerial) -> Result<Option<Owner>, GatewayError>;

    /// Returns every chat linked to the device, in link order, duplicates
    /// included.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_linked_chats(&self, serial: &DeviceSerial) -> Result<Vec<ChatId>, GatewayError>;

    /// Appends a link between `chat_id` and the device. Duplicate links
    /// are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::LinkDeviceNotFound`] if no device has this
    /// serial, or [`GatewayError::PersistenceError`] on storage failure.
    async fn link_chat_to_device(
        &self,
        chat_id: ChatId,
        serial: &DeviceSerial,
    ) -> Result<ChatLink, GatewayError>;

    /// Returns the serial most recently linked to `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_device_serial_for_chat(
        &self,
        chat_id: ChatId,
    ) -> Result<Option<DeviceSerial>, GatewayError>;
}

/// Append-only log of sensor readings per device.
#[async_trait]
pub trait ReadingStore: Send + Sync + fmt::Debug {
    /// Appends a reading; never overwrites an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn save_reading(&self, reading: NewReading) -> Result<Reading, GatewayError>;

    /// Returns the most recently inserted reading for the serial.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_last_reading(&self, serial: &DeviceSerial)
    -> Result<Option<Reading>, GatewayError>;
}
