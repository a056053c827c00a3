//! Dispatcher for the cleaning marketplace.
//!
//! Serves the matching engine over a JSON API for the client, executor and
//! admin bots, and runs the sweeper that expires offers and sends reminders.

mod config;
mod error;
mod routes;
mod state;
mod webhook;

use std::sync::Arc;

use database::Database;
use matching::{LoggingSender, MatchingEngine, NotificationSender, Sweeper};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::webhook::WebhookSender;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!(addr = %config.addr, "Starting dispatcher");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let sender: Arc<dyn NotificationSender> = match &config.notify_webhook_url {
        Some(url) => {
            info!(url = %url, "Delivering notifications to webhook");
            Arc::new(WebhookSender::new(url.clone()))
        }
        None => {
            warn!("NOTIFY_WEBHOOK_URL not set, notifications are only logged");
            Arc::new(LoggingSender)
        }
    };

    let engine = Arc::new(MatchingEngine::new(
        db.clone(),
        sender,
        config.engine_config(),
    ));

    // Expiry, block release and reminders
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = Sweeper::new(engine.clone())
        .with_period(config.sweep_interval)
        .spawn(shutdown_rx);

    let state = AppState::new(db.clone(), engine);
    let app = routes::router().with_state(state);

    info!(addr = %config.addr, "Dispatcher listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        warn!("Sweeper task ended abnormally: {}", e);
    }
    db.close().await;

    info!("Dispatcher stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received SIGINT, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received SIGINT, shutting down");
    }
}
