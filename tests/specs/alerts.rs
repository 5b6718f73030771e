//! Alert dedupe and channel fan-out.

use dix_adapters::{AlertChannel, ChannelError};
use dix_core::{Alert, AlertType, Settings, SettingsHandle, Severity};
use dix_engine::{AlertManager, Metrics};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Default)]
struct RecordingChannel {
    delivered: Arc<Mutex<Vec<Alert>>>,
}

#[async_trait::async_trait]
impl AlertChannel for RecordingChannel {
    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        self.delivered.lock().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn manager(channel: &RecordingChannel) -> AlertManager {
    AlertManager::new(
        vec![Box::new(channel.clone())],
        SettingsHandle::new(Settings::default()),
        Metrics::new(""),
        None,
    )
}

fn high_cpu(at_ms: u64) -> Alert {
    Alert::new(AlertType::HighCpu, Severity::Warning, "svc", "cpu at 85%", at_ms)
}

/// Fires at t, t+30s, t+4min (all inside the 5min window) and t+6min:
/// channels receive exactly two payloads.
#[tokio::test]
async fn dedupe_window_collapses_to_two_fires() {
    let channel = RecordingChannel::default();
    let manager = manager(&channel);

    let t0: u64 = 10_000_000;
    manager.fire(high_cpu(t0)).await;
    manager.fire(high_cpu(t0 + 30_000)).await;
    manager.fire(high_cpu(t0 + 4 * 60_000)).await;
    manager.fire(high_cpu(t0 + 6 * 60_000)).await;

    let delivered = channel.delivered.lock();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].timestamp_ms, t0);
    assert_eq!(delivered[1].timestamp_ms, t0 + 6 * 60_000);
}

/// The fingerprint is (type, service, severity): changing any field
/// escapes the dedupe window.
#[tokio::test]
async fn fingerprint_components_are_type_service_severity() {
    let channel = RecordingChannel::default();
    let manager = manager(&channel);

    manager.fire(high_cpu(1_000)).await;
    manager
        .fire(Alert::new(AlertType::HighMemory, Severity::Warning, "svc", "rss", 1_000))
        .await;
    manager
        .fire(Alert::new(AlertType::HighCpu, Severity::Warning, "other", "cpu", 1_000))
        .await;
    manager
        .fire(Alert::new(AlertType::HighCpu, Severity::Critical, "svc", "cpu", 1_000))
        .await;
    // Same fingerprint as the first: suppressed.
    manager.fire(high_cpu(2_000)).await;

    assert_eq!(channel.delivered.lock().len(), 4);
}
