//! Domain layer: alerts, devices, notifications, and chat conversations.
//!
//! This module contains the server-side domain model: the validated alert,
//! the directory entities (devices, owners, chat links, readings), the
//! notification payloads with their delivery outcomes, and the concurrent
//! per-chat conversation table.

pub mod alert;
pub mod conversation;
pub mod device;
pub mod notification;
pub mod serial;

pub use alert::{Alert, AlertPayload};
pub use conversation::{ConversationState, ConversationTable};
pub use device::{ChatLink, Device, NewReading, Owner, Reading};
pub use notification::{
    ChatDelivery, DeliveryOutcome, DispatchResult, NotificationPayload, QueueOutcome,
    format_chat_alert, state_label,
};
pub use serial::{ChatId, DeviceSerial};
