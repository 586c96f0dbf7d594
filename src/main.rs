use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cowatch_server::config::{establish_connection, AppConfig};
use cowatch_server::domain::bot::conversation::ConversationStore;
use cowatch_server::domain::health::init_start_time;
use cowatch_server::domain::movie::client::{KinopoiskClient, MetadataResolver};
use cowatch_server::domain::slot::provisioner::{RoomProvisioner, WatchTogetherClient};
use cowatch_server::domain::slot::sweeper::CompletionSweeper;
use cowatch_server::notification::{LogSink, NotificationSink, WebhookSink};
use cowatch_server::utils::logging::init_logging;
use cowatch_server::utils::shutdown::shutdown_signal;
use cowatch_server::{app, AppState};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment and logging
    dotenvy::dotenv().ok();
    let _log_guard = init_logging();
    init_start_time();

    let config = AppConfig::from_env()?;

    // 2. Database
    let db = establish_connection(&config.database_url, config.db_schema_update).await?;

    // 3. Collaborators
    let timeout = Duration::from_secs(config.external_timeout_secs);

    let metadata: Option<Arc<dyn MetadataResolver>> = match &config.kinopoisk_api_key {
        Some(key) => Some(Arc::new(KinopoiskClient::new(
            key.clone(),
            config.kinopoisk_api_base.clone(),
            timeout,
        )?)),
        None => None,
    };

    let room_provisioner: Option<Arc<dyn RoomProvisioner>> =
        match &config.watch_together_api_key {
            Some(key) => Some(Arc::new(WatchTogetherClient::new(
                key.clone(),
                config.watch_together_api_base.clone(),
                timeout,
            )?)),
            None => None,
        };

    let notifier: Arc<dyn NotificationSink> = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookSink::new(url.clone(), timeout)?),
        None => {
            tracing::info!("NOTIFY_WEBHOOK_URL is not set, notifications are logged only");
            Arc::new(LogSink)
        }
    };

    let conversations =
        ConversationStore::new(Duration::from_secs(config.conversation_ttl_secs));

    let state = AppState {
        db,
        config: config.clone(),
        notifier,
        metadata,
        room_provisioner,
        conversations,
    };

    // 4. Background sweeper, stopped together with the server
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let sweeper = CompletionSweeper::new(state.clone());
    let sweeper_handle = tokio::spawn(sweeper.run_until(async move {
        let _ = stop_rx.changed().await;
    }));

    // 5. Server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = stop_tx.send(true);
    if let Err(e) = sweeper_handle.await {
        tracing::error!(error = %e, "Completion sweeper task failed");
    }

    tracing::info!("Server stopped");
    Ok(())
}
