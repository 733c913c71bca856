//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::service::NotificationDispatcher;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Alert dispatcher for all business logic.
    pub dispatcher: Arc<NotificationDispatcher>,
    /// Deadline applied to each alert dispatch.
    pub dispatch_timeout: Duration,
}
