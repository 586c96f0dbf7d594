use async_trait::async_trait;
use tracing::info;

use super::{DomainEvent, NotificationSink};
use crate::utils::error::AppError;

/// Writes events to the log only. Used when no webhook is configured.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, event: &DomainEvent) -> Result<(), AppError> {
        let payload = serde_json::to_string(event).unwrap_or_default();
        info!(event = event.name(), payload = %payload, "notification");
        Ok(())
    }
}
