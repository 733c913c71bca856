//! PostgreSQL implementation of the persistence layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{DeviceDirectory, ReadingStore};
use crate::domain::{ChatId, ChatLink, Device, DeviceSerial, NewReading, Owner, Reading};
use crate::error::GatewayError;

/// PostgreSQL-backed directory and reading store using `sqlx::PgPool`.
///
/// Schema lives in `migrations/` and is applied at startup.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))
    }
}

#[async_trait]
impl DeviceDirectory for PostgresStore {
    async fn get_device(&self, serial: &DeviceSerial) -> Result<Option<Device>, GatewayError> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, serial FROM devices WHERE serial = $1",
        )
        .bind(serial.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, serial)| Device {
            id,
            serial: DeviceSerial::from(serial),
        }))
    }

    async fn get_owner(&self, serial: &DeviceSerial) -> Result<Option<Owner>, GatewayError> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT u.id, u.username, u.email FROM devices d \
             JOIN users u ON u.id = d.owner_id WHERE d.serial = $1",
        )
        .bind(serial.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, username, email)| Owner {
            id,
            username,
            email,
        }))
    }

    async fn get_linked_chats(&self, serial: &DeviceSerial) -> Result<Vec<ChatId>, GatewayError> {
        let chats = sqlx::query_scalar::<_, i64>(
            "SELECT chat_id FROM chat_links WHERE serial = $1 ORDER BY id ASC",
        )
        .bind(serial.as_str())
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(%serial, count = chats.len(), "resolved linked chats");
        Ok(chats)
    }

    async fn link_chat_to_device(
        &self,
        chat_id: ChatId,
        serial: &DeviceSerial,
    ) -> Result<ChatLink, GatewayError> {
        if self.get_device(serial).await?.is_none() {
            return Err(GatewayError::LinkDeviceNotFound(serial.to_string()));
        }

        let linked_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "INSERT INTO chat_links (chat_id, serial) VALUES ($1, $2) RETURNING linked_at",
        )
        .bind(chat_id)
        .bind(serial.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(ChatLink {
            chat_id,
            serial: serial.clone(),
            linked_at,
        })
    }

    async fn get_device_serial_for_chat(
        &self,
        chat_id: ChatId,
    ) -> Result<Option<DeviceSerial>, GatewayError> {
        let serial = sqlx::query_scalar::<_, String>(
            "SELECT serial FROM chat_links WHERE chat_id = $1 \
             ORDER BY linked_at DESC, id DESC LIMIT 1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(serial.map(DeviceSerial::from))
    }
}

#[async_trait]
impl ReadingStore for PostgresStore {
    async fn save_reading(&self, reading: NewReading) -> Result<Reading, GatewayError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO readings (serial, activated_at, state) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(reading.serial.as_str())
        .bind(&reading.activated_at)
        .bind(&reading.state)
        .fetch_one(&self.pool)
        .await?;

        Ok(Reading {
            id,
            serial: reading.serial,
            activated_at: reading.activated_at,
            state: reading.state,
        })
    }

    async fn get_last_reading(
        &self,
        serial: &DeviceSerial,
    ) -> Result<Option<Reading>, GatewayError> {
        let row = sqlx::query_as::<_, (i64, String, String, String)>(
            "SELECT id, serial, activated_at, state FROM readings \
             WHERE serial = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(serial.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, serial, activated_at, state)| Reading {
            id,
            serial: DeviceSerial::from(serial),
            activated_at,
            state,
        }))
    }
}
