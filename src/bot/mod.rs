//! Telegram bot front end.
//!
//! Long-polls the Bot API for updates and hands every text message to the
//! [`crate::service::RegistrationService`], one task per update. Replies
//! go back through the same [`crate::channels::ChatSender`] the alert
//! dispatcher uses.

pub mod poller;

pub use poller::{handle_update, run_bot};
