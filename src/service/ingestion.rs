//! Alert ingestion: decode and validate an inbound payload.

use crate::domain::{Alert, AlertPayload};
use crate::error::GatewayError;

/// Decodes `raw` as an alert payload and validates required fields.
///
/// Only borrows the body, so the caller keeps it for logging or size
/// inspection. Has no side effects.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if `raw` is not a JSON object
/// matching the alert shape or if `numeroSerie` or `sensor` is empty.
pub fn parse_alert(raw: &[u8]) -> Result<Alert, GatewayError> {
    let payload: AlertPayload = serde_json::from_slice(raw)
        .map_err(|e| GatewayError::InvalidRequest(format!("malformed alert body: {e}")))?;
    Alert::try_from(payload)
}
