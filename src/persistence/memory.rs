//! In-memory directory and reading store.
//!
//! Used to drive the dispatcher and the registration conversation without
//! a database. Both stores can be switched into a failing mode to exercise
//! storage error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{DeviceDirectory, ReadingStore};
use crate::domain::{ChatId, ChatLink, Device, DeviceSerial, NewReading, Owner, Reading};
use crate::error::GatewayError;

/// Device record with its optional owner.
#[derive(Debug, Clone)]
struct DeviceRecord {
    device: Device,
    owner: Option<Owner>,
}

/// In-memory [`DeviceDirectory`].
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    devices: RwLock<HashMap<DeviceSerial, DeviceRecord>>,
    links: RwLock<Vec<ChatLink>>,
    next_id: AtomicI64,
    failing: AtomicBool,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions a device, optionally claimed by `owner`.
    pub async fn add_device(&self, serial: impl Into<DeviceSerial>, owner: Option<Owner>) -> Device {
        let serial = serial.into();
        let device = Device {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            serial: serial.clone(),
        };
        self.devices.write().await.insert(
            serial,
            DeviceRecord {
                device: device.clone(),
                owner,
            },
        );
        device
    }

    /// Makes every subsequent call fail with a persistence error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a snapshot of all recorded links, in insertion order.
    pub async fn links(&self) -> Vec<ChatLink> {
        self.links.read().await.clone()
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::PersistenceError(
                "directory unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceDirectory for MemoryDirectory {
    async fn get_device(&self, serial: &DeviceSerial) -> Result<Option<Device>, GatewayError> {
        self.check()?;
        Ok(self
            .devices
            .read()
            .await
            .get(serial)
            .map(|r| r.device.clone()))
    }

    async fn get_owner(&self, serial: &DeviceSerial) -> Result<Option<Owner>, GatewayError> {
        self.check()?;
        Ok(self
            .devices
            .read()
            .await
            .get(serial)
            .and_then(|r| r.owner.clone()))
    }

    async fn get_linked_chats(&self, serial: &DeviceSerial) -> Result<Vec<ChatId>, GatewayError> {
        self.check()?;
        Ok(self
            .links
            .read()
            .await
            .iter()
            .filter(|link| &link.serial == serial)
            .map(|link| link.chat_id)
            .collect())
    }

    async fn link_chat_to_device(
        &self,
        chat_id: ChatId,
        serial: &DeviceSerial,
    ) -> Result<ChatLink, GatewayError> {
        self.check()?;
        if !self.devices.read().await.contains_key(serial) {
            return Err(GatewayError::LinkDeviceNotFound(serial.to_string()));
        }
        let link = ChatLink {
            chat_id,
            serial: serial.clone(),
            linked_at: Utc::now(),
        };
        self.links.write().await.push(link.clone());
        Ok(link)
    }

    async fn get_device_serial_for_chat(
        &self,
        chat_id: ChatId,
    ) -> Result<Option<DeviceSerial>, GatewayError> {
        self.check()?;
        Ok(self
            .links
            .read()
            .await
            .iter()
            .rev()
            .find(|link| link.chat_id == chat_id)
            .map(|link| link.serial.clone()))
    }
}

/// In-memory [`ReadingStore`].
#[derive(Debug, Default)]
pub struct MemoryReadingStore {
    readings: RwLock<Vec<Reading>>,
    failing: AtomicBool,
}

impl MemoryReadingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a persistence error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the number of stored readings across all devices.
    pub async fn len(&self) -> usize {
        self.readings.read().await.len()
    }

    /// Returns `true` if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.readings.read().await.is_empty()
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::PersistenceError(
                "reading store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn save_reading(&self, reading: NewReading) -> Result<Reading, GatewayError> {
        self.check()?;
        let mut readings = self.readings.write().await;
        let id = i64::try_from(readings.len()).unwrap_or(i64::MAX).saturating_add(1);
        let stored = Reading {
            id,
            serial: reading.serial,
            activated_at: reading.activated_at,
            state: reading.state,
        };
        readings.push(stored.clone());
        Ok(stored)
    }

    async fn get_last_reading(
        &self,
        serial: &DeviceSerial,
    ) -> Result<Option<Reading>, GatewayError> {
        self.check()?;
        Ok(self
            .readings
            .read()
            .await
            .iter()
            .rev()
            .find(|r| &r.serial == serial)
            .cloned())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn owner() -> Owner {
        Owner {
            id: 7,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_device_has_no_owner_and_no_chats() {
        let dir = MemoryDirectory::new();
        let serial = DeviceSerial::from("NOPE");
        assert!(matches!(dir.get_owner(&serial).await, Ok(None)));
        let Ok(chats) = dir.get_linked_chats(&serial).await else {
            panic!("lookup failed");
        };
        assert!(chats.is_empty());
    }

    #[tokio::test]
    async fn unclaimed_device_resolves_without_owner() {
        let dir = MemoryDirectory::new();
        dir.add_device("ABC123", None).await;
        let serial = DeviceSerial::from("ABC123");
        assert!(matches!(dir.get_device(&serial).await, Ok(Some(_))));
        assert!(matches!(dir.get_owner(&serial).await, Ok(None)));
    }

    #[tokio::test]
    async fn duplicate_links_are_kept() {
        let dir = MemoryDirectory::new();
        dir.add_device("ABC123", Some(owner())).await;
        let serial = DeviceSerial::from("ABC123");

        assert!(dir.link_chat_to_device(100, &serial).await.is_ok());
        assert!(dir.link_chat_to_device(100, &serial).await.is_ok());

        let Ok(chats) = dir.get_linked_chats(&serial).await else {
            panic!("lookup failed");
        };
        assert_eq!(chats, vec![100, 100]);
    }

    #[tokio::test]
    async fn linking_unknown_serial_fails_with_not_found() {
        let dir = MemoryDirectory::new();
        let result = dir.link_chat_to_device(1, &DeviceSerial::from("BAD")).await;
        assert!(matches!(result, Err(GatewayError::LinkDeviceNotFound(_))));
        assert!(dir.links().await.is_empty());
    }

    #[tokio::test]
    async fn serial_for_chat_is_most_recent_link() {
        let dir = MemoryDirectory::new();
        dir.add_device("FIRST", None).await;
        dir.add_device("SECOND", None).await;
        assert!(matches!(dir.get_device_serial_for_chat(9).await, Ok(None)));

        let _ = dir.link_chat_to_device(9, &DeviceSerial::from("FIRST")).await;
        let _ = dir.link_chat_to_device(9, &DeviceSerial::from("SECOND")).await;

        let Ok(Some(serial)) = dir.get_device_serial_for_chat(9).await else {
            panic!("expected a linked serial");
        };
        assert_eq!(serial.as_str(), "SECOND");
    }

    #[tokio::test]
    async fn identical_readings_are_stored_twice() {
        let store = MemoryReadingStore::new();
        let reading = NewReading {
            serial: DeviceSerial::from("ABC123"),
            activated_at: "2024-05-01 10:00:00".to_string(),
            state: "1".to_string(),
        };

        let Ok(first) = store.save_reading(reading.clone()).await else {
            panic!("save failed");
        };
        let Ok(second) = store.save_reading(reading).await else {
            panic!("save failed");
        };
        assert_ne!(first.id, second.id);
        assert_eq!(store.len().await, 2);

        let Ok(Some(last)) = store.get_last_reading(&DeviceSerial::from("ABC123")).await else {
            panic!("expected a reading");
        };
        assert_eq!(last.id, second.id);
    }

    #[tokio::test]
    async fn missing_reading_is_none() {
        let store = MemoryReadingStore::new();
        let result = store.get_last_reading(&DeviceSerial::from("ABC123")).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn failing_store_reports_persistence_error() {
        let store = MemoryReadingStore::new();
        store.set_failing(true);
        let result = store.get_last_reading(&DeviceSerial::from("ABC123")).await;
        assert!(matches!(result, Err(GatewayError::PersistenceError(_))));
    }
}
