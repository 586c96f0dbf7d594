//! JSON webhook delivery of domain events to the chat front-end.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use super::{DomainEvent, NotificationSink};
use crate::utils::error::AppError;

#[derive(Debug, Clone)]
pub struct WebhookSink {
    webhook_url: String,
    client: Client,
}

impl WebhookSink {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            webhook_url: webhook_url.into(),
            client,
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn notify(&self, event: &DomainEvent) -> Result<(), AppError> {
        debug!(event = event.name(), "Sending notification webhook");

        let response = self
            .client
            .post(&self.webhook_url)
            .json(event)
            .send()
            .await
            .map_err(|e| {
                error!("Notification webhook request failed: {}", e);
                AppError::ExternalServiceError(format!("Notification webhook failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Notification webhook rejected the event");
            return Err(AppError::ExternalServiceError(format!(
                "Notification webhook returned {}",
                status
            )));
        }

        Ok(())
    }
}
