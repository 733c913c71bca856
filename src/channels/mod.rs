//! Notification channel implementations.
//!
//! Two independent best-effort channels: the owner notification queue
//! ([`QueuePublisher`], backed by NATS JetStream) and direct chat pushes
//! ([`ChatSender`], backed by the Telegram Bot API). Each has an in-memory
//! recording double in [`memory`].

pub mod memory;
pub mod nats;
pub mod telegram;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{ChatId, NotificationPayload};
use crate::error::DeliveryError;

/// Publishes owner notifications to the downstream queue.
#[async_trait]
pub trait QueuePublisher: Send + Sync + fmt::Debug {
    /// Publishes one notification and waits for the queue to accept it.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the message could not be encoded,
    /// sent or acknowledged.
    async fn publish(&self, payload: &NotificationPayload) -> Result<(), DeliveryError>;
}

/// Sends plain-text messages to chat endpoints.
#[async_trait]
pub trait ChatSender: Send + Sync + fmt::Debug {
    /// Sends `text` to `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the platform is unreachable or
    /// refuses the message.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError>;
}
