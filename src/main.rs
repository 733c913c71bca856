//! alert-gateway server entry point.
//!
//! Connects storage, the notification queue and the Telegram bot, then
//! starts the Axum HTTP server for device alerts.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use alert_gateway::api;
use alert_gateway::app_state::AppState;
use alert_gateway::bot;
use alert_gateway::channels::ChatSender;
use alert_gateway::channels::nats::NatsQueue;
use alert_gateway::channels::telegram::TelegramClient;
use alert_gateway::config::GatewayConfig;
use alert_gateway::persistence::PostgresStore;
use alert_gateway::service::{NotificationDispatcher, RegistrationService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config =
        GatewayConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    tracing::info!(addr = %config.listen_addr, "starting alert-gateway");

    // Storage
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;
    let store = Arc::new(PostgresStore::new(pool));
    store.migrate().await.context("failed to apply migrations")?;

    // Channels
    let queue = NatsQueue::connect(
        &config.nats_url,
        &config.nats_queue,
        Duration::from_secs(config.nats_connect_timeout_secs),
    )
    .await
    .context("failed to set up notification queue")?;
    let telegram = Arc::new(TelegramClient::new(
        &config.telegram_api_base,
        &config.telegram_bot_token,
    ));
    let chat: Arc<dyn ChatSender> = Arc::clone(&telegram) as Arc<dyn ChatSender>;

    // Build service layer
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&store) as _,
        Arc::clone(&store) as _,
        Arc::new(queue),
        Arc::clone(&chat),
        config.persisted_sensor_kinds.clone(),
    ));
    let registration = Arc::new(RegistrationService::new(
        Arc::clone(&store) as _,
        Arc::clone(&store) as _,
        config.registration_timeout(),
    ));

    // Telegram bot
    let bot_task = tokio::spawn(bot::run_bot(
        telegram,
        registration,
        chat,
        Duration::from_secs(config.telegram_poll_timeout_secs),
    ));

    // Build router
    let app_state = AppState {
        dispatcher,
        dispatch_timeout: config.dispatch_timeout(),
    };
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let served = axum::serve(listener, app).await;
    bot_task.abort();
    served.context("server error")?;

    Ok(())
}
