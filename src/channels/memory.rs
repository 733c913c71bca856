//! Recording queue and chat doubles.
//!
//! Both record every attempt, successful or not, and can be told to fail
//! so that best-effort delivery paths can be exercised.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ChatSender, QueuePublisher};
use crate::domain::{ChatId, NotificationPayload};
use crate::error::DeliveryError;

/// [`QueuePublisher`] that keeps published payloads in memory.
#[derive(Debug, Default)]
pub struct RecordingQueue {
    published: Mutex<Vec<NotificationPayload>>,
    attempts: Mutex<usize>,
    failing: AtomicBool,
}

impl RecordingQueue {
    /// Creates an empty, healthy queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent publishes fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Payloads accepted so far.
    pub async fn published(&self) -> Vec<NotificationPayload> {
        self.published.lock().await.clone()
    }

    /// Publish attempts so far, including failed ones.
    pub async fn attempts(&self) -> usize {
        *self.attempts.lock().await
    }
}

#[async_trait]
impl QueuePublisher for RecordingQueue {
    async fn publish(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        *self.attempts.lock().await += 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Queue("queue unavailable".to_string()));
        }
        self.published.lock().await.push(payload.clone());
        Ok(())
    }
}

/// [`ChatSender`] that records every send attempt.
#[derive(Debug, Default)]
pub struct RecordingChat {
    attempts: Mutex<Vec<(ChatId, String)>>,
    failing_chats: Mutex<HashSet<ChatId>>,
}

impl RecordingChat {
    /// Creates a chat double where every send succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sends to `chat_id` fail from now on.
    pub async fn fail_for(&self, chat_id: ChatId) {
        self.failing_chats.lock().await.insert(chat_id);
    }

    /// Every attempted send, in call order, including failed ones.
    pub async fn attempts(&self) -> Vec<(ChatId, String)> {
        self.attempts.lock().await.clone()
    }

    /// Texts sent to `chat_id`, in call order.
    pub async fn messages_for(&self, chat_id: ChatId) -> Vec<String> {
        self.attempts
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatSender for RecordingChat {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.attempts.lock().await.push((chat_id, text.to_string()));
        if self.failing_chats.lock().await.contains(&chat_id) {
            return Err(DeliveryError::Rejected(format!("chat {chat_id} blocked the bot")));
        }
        Ok(())
    }
}
