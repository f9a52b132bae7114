//! Delivery of terminal-state notifications.
//!
//! Every event is logged; when a webhook URL is configured the event JSON is
//! also POSTed there. `no_action` detections are never delivered.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::error::NotifyError;
use crate::job::{Detection, NotificationEvent};
use crate::report::RunReport;

#[allow(async_fn_in_trait)]
pub trait NotificationSink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Writes each event as a structured log record.
pub struct LogSink;

impl NotificationSink for LogSink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        tracing::info!(
            event = %event.event,
            job_id = %event.job_id,
            filename = ?event.filename,
            timestamp = %event.timestamp,
            "{}",
            event.message
        );
        Ok(())
    }
}

/// POSTs each event as JSON to a fixed URL.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { client, url })
    }
}

impl NotificationSink for WebhookSink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(event).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(job_id = %event.job_id, url = %self.url, "Webhook accepted notification");
        Ok(())
    }
}

/// Payload of the error report for a detection whose event was not delivered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Undelivered {
    pub detection: Detection,
}

/// Fans a detection out to the log and, optionally, a webhook.
pub struct Notifier {
    log: LogSink,
    webhook: Option<WebhookSink>,
}

impl Notifier {
    pub fn new(webhook: Option<WebhookSink>) -> Self {
        Self {
            log: LogSink,
            webhook,
        }
    }

    /// Deliver the event carried by `detection`, if any.
    ///
    /// Returns whether anything was sent.
    pub async fn dispatch(&self, detection: &Detection) -> Result<bool, NotifyError> {
        let Some(event) = detection.event() else {
            return Ok(false);
        };
        self.log.deliver(event).await?;
        if let Some(webhook) = &self.webhook {
            webhook.deliver(event).await?;
        }
        Ok(true)
    }

    /// Dispatch `detection` and settle on the one document that describes it.
    ///
    /// On success that is the detection itself. A delivery failure becomes an
    /// error report carrying the detection under `detection`.
    pub async fn deliver(&self, detection: Detection) -> Result<Detection, RunReport<Undelivered>> {
        match self.dispatch(&detection).await {
            Ok(_) => Ok(detection),
            Err(e) => {
                tracing::error!(error = %e, "Notification delivery failed");
                Err(RunReport::Error {
                    message: format!("failed to deliver notification: {e}"),
                    details: Some(Undelivered { detection }),
                })
            }
        }
    }
}
