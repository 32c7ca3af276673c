//! Outbound notification dispatch
//!
//! Production implementation of the `NotificationSender` seam. Messages are
//! handed to an HTTP mail relay; actual delivery is the relay's problem.

use crate::payments::errors::NotificationError;
use crate::payments::traits::NotificationSender;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

/// Mail relay configuration
#[derive(Debug, Clone)]
pub struct MailRelayConfig {
    /// Endpoint accepting `{to, subject, html}` POST bodies
    pub relay_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Address sales notifications are sent to
    pub sales_address: String,
}

impl MailRelayConfig {
    pub fn from_env() -> Result<Self> {
        let relay_url = std::env::var("MAIL_RELAY_URL").context("MAIL_RELAY_URL not set")?;

        let timeout_secs = std::env::var("MAIL_RELAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(15);

        let sales_address =
            std::env::var("SALES_NOTIFY_EMAIL").context("SALES_NOTIFY_EMAIL not set")?;

        Ok(Self {
            relay_url,
            timeout_secs,
            sales_address,
        })
    }
}

/// Notification sender backed by an HTTP mail relay
pub struct MailRelayNotifier {
    config: MailRelayConfig,
    client: Client,
}

impl MailRelayNotifier {
    pub fn new(config: MailRelayConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }
}

#[async_trait]
impl NotificationSender for MailRelayNotifier {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotificationError> {
        let payload = serde_json::json!({
            "to": to,
            "subject": subject,
            "html": html_body,
        });

        let response = self
            .client
            .post(&self.config.relay_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Transport {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected {
                status: response.status().as_u16(),
            });
        }

        info!("Notification dispatched to {}", to);
        Ok(())
    }
}
