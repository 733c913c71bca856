//! Per-chat registration state with per-chat locking.
//!
//! [`ConversationTable`] stores the state of every chat that has talked to
//! the bot in a `HashMap` where each entry is individually protected by a
//! [`tokio::sync::Mutex`]. A chat event holds its own entry's lock for the
//! whole read-modify-write, so events for the same chat are serialized
//! while events for different chats proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::ChatId;

/// Where a chat is in the device linking conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    /// No conversation in progress.
    #[default]
    Idle,
    /// The bot asked for a serial and is waiting for it.
    AwaitingSerial {
        /// When the serial prompt was issued.
        since: Instant,
    },
}

impl ConversationState {
    /// Returns `true` while a serial prompt is pending.
    #[must_use]
    pub const fn is_awaiting_serial(&self) -> bool {
        matches!(self, Self::AwaitingSerial { .. })
    }

    /// Returns `true` if a pending serial prompt is older than `timeout`.
    ///
    /// Always `false` when no timeout is configured or the chat is idle.
    #[must_use]
    pub fn is_expired(&self, timeout: Option<Duration>) -> bool {
        match (self, timeout) {
            (Self::AwaitingSerial { since }, Some(limit)) => since.elapsed() >= limit,
            _ => false,
        }
    }
}

/// Concurrent table of chat conversation states.
///
/// Uses a `RwLock<HashMap<...>>` for the outer map and per-entry
/// `Arc<Mutex<ConversationState>>` so that only events for the same chat
/// contend with each other. Chats never seen before are `Idle`.
#[derive(Debug, Default)]
pub struct ConversationTable {
    chats: RwLock<HashMap<ChatId, Arc<Mutex<ConversationState>>>>,
}

impl ConversationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock guarding `chat_id`'s state, creating an `Idle`
    /// entry on first use.
    pub async fn entry(&self, chat_id: ChatId) -> Arc<Mutex<ConversationState>> {
        if let Some(existing) = self.chats.read().await.get(&chat_id) {
            return Arc::clone(existing);
        }
        let mut map = self.chats.write().await;
        Arc::clone(map.entry(chat_id).or_default())
    }

    /// Returns a snapshot of `chat_id`'s current state.
    pub async fn state(&self, chat_id: ChatId) -> ConversationState {
        let entry = {
            let map = self.chats.read().await;
            map.get(&chat_id).map(Arc::clone)
        };
        match entry {
            Some(lock) => *lock.lock().await,
            None => ConversationState::Idle,
        }
    }

    /// Drops `chat_id`'s entry if it is `Idle` and nobody else holds it.
    ///
    /// An absent entry reads as `Idle`, so this only bounds the table to
    /// chats with a registration in progress. Returns `true` if removed.
    pub async fn evict_if_idle(&self, chat_id: ChatId) -> bool {
        let mut map = self.chats.write().await;
        let removable = map.get(&chat_id).is_some_and(|lock| {
            Arc::strong_count(lock) == 1
                && lock
                    .try_lock()
                    .is_ok_and(|state| !state.is_awaiting_serial())
        });
        if removable {
            map.remove(&chat_id);
        }
        removable
    }

    /// Returns the number of chats with a recorded state.
    pub async fn len(&self) -> usize {
        self.chats.read().await.len()
    }

    /// Returns `true` if no chat has a recorded state.
    pub async fn is_empty(&self) -> bool {
        self.chats.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_chat_is_idle() {
        let table = ConversationTable::new();
        assert_eq!(table.state(42).await, ConversationState::Idle);
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn entry_is_shared_per_chat() {
        let table = ConversationTable::new();
        let a = table.entry(1).await;
        let b = table.entry(1).await;
        assert!(Arc::ptr_eq(&a, &b));

        *a.lock().await = ConversationState::AwaitingSerial {
            since: Instant::now(),
        };
        assert!(table.state(1).await.is_awaiting_serial());
        assert_eq!(table.state(2).await, ConversationState::Idle);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn evicts_only_idle_unheld_entries() {
        let table = ConversationTable::new();

        let idle = table.entry(1).await;
        assert!(!table.evict_if_idle(1).await, "entry still held");
        drop(idle);
        assert!(table.evict_if_idle(1).await);

        *table.entry(2).await.lock().await = ConversationState::AwaitingSerial {
            since: Instant::now(),
        };
        assert!(!table.evict_if_idle(2).await);
        assert!(!table.evict_if_idle(3).await);

        assert_eq!(table.len().await, 1);
        assert!(table.state(2).await.is_awaiting_serial());
    }

    #[tokio::test(start_paused = true)]
    async fn awaiting_serial_expires_after_timeout() {
        let state = ConversationState::AwaitingSerial {
            since: Instant::now(),
        };
        let limit = Some(Duration::from_secs(60));
        assert!(!state.is_expired(limit));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(state.is_expired(limit));
        assert!(!state.is_expired(None));
        assert!(!ConversationState::Idle.is_expired(limit));
    }
}
