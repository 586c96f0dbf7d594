use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::domain::bot::conversation::ConversationStore;
use crate::domain::movie::client::MetadataResolver;
use crate::domain::slot::provisioner::RoomProvisioner;
use crate::notification::NotificationSink;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub notifier: Arc<dyn NotificationSink>,
    /// Absent when no catalog API key is configured.
    pub metadata: Option<Arc<dyn MetadataResolver>>,
    /// Absent when room provisioning is not configured.
    pub room_provisioner: Option<Arc<dyn RoomProvisioner>>,
    pub conversations: ConversationStore,
}

#[cfg(test)]
impl AppState {
    /// In-memory SQLite with the full schema, no collaborators and a
    /// log-only notifier.
    pub(crate) async fn in_memory() -> Self {
        use std::time::Duration;

        use sea_orm::{ConnectOptions, Database};

        use crate::notification::LogSink;

        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        crate::config::sync_schema(&db).await.unwrap();

        let config = AppConfig::default();
        Self {
            db,
            conversations: ConversationStore::new(Duration::from_secs(
                config.conversation_ttl_secs,
            )),
            config,
            notifier: Arc::new(LogSink),
            metadata: None,
            room_provisioner: None,
        }
    }
}
