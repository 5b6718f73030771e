// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert delivery channels.
//!
//! Channels are fire-and-forget from the pipeline's perspective: a failing
//! channel is logged and the remaining channels still receive the alert.

use async_trait::async_trait;
use dix_core::{Alert, Severity};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status: {0}")]
    Status(u16),
}

/// One delivery target for fired alerts.
#[async_trait]
pub trait AlertChannel: Send + Sync + 'static {
    async fn send(&self, alert: &Alert) -> Result<(), ChannelError>;
    fn name(&self) -> &'static str;
}

/// Always-on channel that maps severity onto log levels.
#[derive(Clone, Default)]
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        match alert.severity {
            Severity::Info => info!(
                alert_type = %alert.alert_type,
                service = %alert.service,
                "{}", alert.message
            ),
            Severity::Warning => warn!(
                alert_type = %alert.alert_type,
                service = %alert.service,
                "{}", alert.message
            ),
            Severity::Critical => error!(
                alert_type = %alert.alert_type,
                service = %alert.service,
                "{}", alert.message
            ),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Generic webhook: POST the alert as flat JSON, 2xx counts as delivered.
#[derive(Clone)]
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        let payload = serde_json::json!({
            "type": alert.alert_type,
            "severity": alert.severity,
            "service": alert.service,
            "message": alert.message,
            "timestamp": alert.timestamp_ms,
            "labels": alert.labels,
        });

        let response = self
            .client
            .post(&self.url)
            .timeout(WEBHOOK_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ChannelError::Status(status.as_u16()))
        }
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Chat webhook (Slack-compatible attachment form, color-coded by severity).
#[derive(Clone)]
pub struct ChatWebhookChannel {
    client: reqwest::Client,
    url: String,
}

impl ChatWebhookChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    fn color(severity: Severity) -> &'static str {
        match severity {
            Severity::Info => "good",
            Severity::Warning => "warning",
            Severity::Critical => "danger",
        }
    }
}

#[async_trait]
impl AlertChannel for ChatWebhookChannel {
    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        let payload = serde_json::json!({
            "attachments": [{
                "color": Self::color(alert.severity),
                "title": format!("[{}] {}", alert.severity, alert.alert_type),
                "text": alert.message,
                "fields": [
                    { "title": "service", "value": alert.service, "short": true },
                ],
                "ts": alert.timestamp_ms / 1000,
            }]
        });

        let response = self
            .client
            .post(&self.url)
            .timeout(WEBHOOK_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ChannelError::Status(status.as_u16()))
        }
    }

    fn name(&self) -> &'static str {
        "chat"
    }
}

/// Email placeholder: records the intent in the log until SMTP lands.
#[derive(Clone, Default)]
pub struct EmailChannel;

#[async_trait]
impl AlertChannel for EmailChannel {
    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        info!(
            alert_type = %alert.alert_type,
            service = %alert.service,
            severity = %alert.severity,
            "email channel placeholder: {}",
            alert.message
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
#[path = "alert_tests.rs"]
mod tests;
