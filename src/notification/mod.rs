pub mod event;
pub mod log_sink;
pub mod webhook;

use async_trait::async_trait;
use tracing::warn;

use crate::utils::error::AppError;

pub use event::DomainEvent;
pub use log_sink::LogSink;
pub use webhook::WebhookSink;

/// Receiver of domain events (rendering and delivery live behind it).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &DomainEvent) -> Result<(), AppError>;
}

/// Delivers an event; failures are logged and never reach the caller.
pub async fn dispatch(sink: &dyn NotificationSink, event: DomainEvent) {
    if let Err(e) = sink.notify(&event).await {
        warn!(event = event.name(), error = %e, "Notification delivery failed");
    }
}
