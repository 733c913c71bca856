//! Service layer: business logic orchestration.
//!
//! - [`ingestion`] decodes and validates inbound alert bodies.
//! - [`NotificationDispatcher`] persists, publishes and fans out alerts.
//! - [`RegistrationService`] runs the per-chat device registration
//!   conversation and answers last-reading queries.

pub mod dispatcher;
pub mod ingestion;
pub mod registration;

pub use dispatcher::NotificationDispatcher;
pub use ingestion::parse_alert;
pub use registration::{ChatInput, RegistrationService};
