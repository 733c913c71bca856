//! Alert endpoint DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::DispatchResult;

/// Status reported for a processed alert.
pub const ALERT_STATUS_SUCCESS: &str = "success";

/// Message reported for a processed alert.
pub const ALERT_PROCESSED_MESSAGE: &str = "Alerta procesada correctamente";

/// Response body for `POST /api/alerts`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertResponse {
    /// Always `"success"`.
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
    /// Number of chats a push was attempted for, as a decimal string.
    pub chats_notified: String,
}

impl From<&DispatchResult> for AlertResponse {
    fn from(result: &DispatchResult) -> Self {
        Self {
            status: ALERT_STATUS_SUCCESS.to_string(),
            message: ALERT_PROCESSED_MESSAGE.to_string(),
            chats_notified: result.attempted_chats.to_string(),
        }
    }
}
