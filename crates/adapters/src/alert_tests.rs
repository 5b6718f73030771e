// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dix_core::{Alert, AlertType};

fn alert(severity: Severity) -> Alert {
    Alert::new(AlertType::HighCpu, severity, "polkadot-node", "cpu at 97%", 1_000)
}

#[tokio::test]
async fn log_channel_always_delivers() {
    let channel = LogChannel;
    for severity in [Severity::Info, Severity::Warning, Severity::Critical] {
        channel.send(&alert(severity)).await.unwrap();
    }
    assert_eq!(channel.name(), "log");
}

#[tokio::test]
async fn email_placeholder_only_logs() {
    let channel = EmailChannel;
    channel.send(&alert(Severity::Critical)).await.unwrap();
    assert_eq!(channel.name(), "email");
}

#[tokio::test]
async fn webhook_failure_is_an_error() {
    // Nothing listens here; the send must surface a request error.
    let channel = WebhookChannel::new("http://127.0.0.1:1/hook");
    let err = channel.send(&alert(Severity::Warning)).await.unwrap_err();
    assert!(matches!(err, ChannelError::Request(_)));
}

#[yare::parameterized(
    info     = { Severity::Info, "good" },
    warning  = { Severity::Warning, "warning" },
    critical = { Severity::Critical, "danger" },
)]
fn chat_colors_follow_severity(severity: Severity, expected: &str) {
    assert_eq!(ChatWebhookChannel::color(severity), expected);
}
