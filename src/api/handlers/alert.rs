//! Alert ingestion endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{debug, info};

use crate::api::dto::AlertResponse;
use crate::app_state::AppState;
use crate::domain::AlertPayload;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::parse_alert;

/// `POST /api/alerts`: receive one sensor alert and fan it out.
///
/// The body is read raw so it can be logged before decoding.
///
/// # Errors
///
/// Returns [`GatewayError`] on a malformed body, an unknown device, a
/// storage failure or a dispatch that exceeds the configured deadline.
#[utoipa::path(
    post,
    path = "/api/alerts",
    tag = "Alerts",
    summary = "Receive a sensor alert",
    description = "Validates the alert, stores tracked readings, notifies the device owner through the queue and pushes a message to every linked chat.",
    request_body = AlertPayload,
    responses(
        (status = 200, description = "Alert processed", body = AlertResponse),
        (status = 400, description = "Malformed or incomplete alert", body = ErrorResponse),
        (status = 405, description = "Method other than POST"),
        (status = 500, description = "Unknown device, storage failure or timeout", body = ErrorResponse),
    )
)]
pub async fn receive_alert(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, GatewayError> {
    debug!(
        size = body.len(),
        body = %String::from_utf8_lossy(&body),
        "alert body received"
    );

    let alert = parse_alert(&body)?;
    info!(
        serial = %alert.serial,
        sensor = %alert.sensor_kind,
        state = alert.state,
        "alert received"
    );

    let result = tokio::time::timeout(state.dispatch_timeout, state.dispatcher.dispatch(&alert))
        .await
        .map_err(|_| GatewayError::DispatchTimeout(state.dispatch_timeout.as_secs()))??;

    Ok((StatusCode::OK, Json(AlertResponse::from(&result))))
}

/// Alert routes mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/alerts", post(receive_alert))
}
