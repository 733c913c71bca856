//! Data Transfer Objects for REST request/response serialization.
//!
//! The alert request body is [`crate::domain::AlertPayload`], which keeps
//! the device firmware's field names.

pub mod alert_dto;

pub use alert_dto::*;
