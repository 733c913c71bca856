//! # alert-gateway
//!
//! Ingests sensor alerts from remote field devices and fans them out to the
//! people who care about them: the device owner through a notification queue
//! (NATS JetStream) and every linked chat through the Telegram Bot API. A
//! companion chat conversation lets a Telegram user link a device by serial.
//!
//! ## Architecture
//!
//! ```text
//! Field devices (HTTP POST)        Telegram users (long-poll)
//!     │                                 │
//!     ├── REST Handlers (api/)          ├── Bot poller (bot/)
//!     │                                 │
//!     ├── NotificationDispatcher        ├── RegistrationService
//!     │        (service/)               │        (service/)
//!     │                                 │
//!     ├── DeviceDirectory / ReadingStore (persistence/, PostgreSQL)
//!     │
//!     └── QueuePublisher / ChatSender (channels/, NATS + Telegram)
//! ```

pub mod api;
pub mod app_state;
pub mod bot;
pub mod channels;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
