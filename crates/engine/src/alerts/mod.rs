// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alerting pipeline: rule evaluation → dedupe → channel fan-out.

pub mod rules;

use crate::metrics::Metrics;
use dix_adapters::AlertChannel;
use dix_core::{Alert, AlertRecord, AlertType, SettingsHandle, Severity};
use dix_storage::HistoryStore;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Alert manager owning the dedupe window, the active set, and the channels.
pub struct AlertManager {
    channels: Vec<Box<dyn AlertChannel>>,
    settings: SettingsHandle,
    metrics: Arc<Metrics>,
    history: Option<Arc<HistoryStore>>,
    /// Active alerts keyed by fingerprint.
    active: Mutex<HashMap<String, Alert>>,
    /// Last fire time per fingerprint (epoch ms), for dedupe.
    last_fired: Mutex<HashMap<String, u64>>,
    /// (type, severity) combos ever gauged, so emptied combos reset to 0.
    known_combos: Mutex<HashSet<(AlertType, Severity)>>,
}

impl AlertManager {
    pub fn new(
        channels: Vec<Box<dyn AlertChannel>>,
        settings: SettingsHandle,
        metrics: Arc<Metrics>,
        history: Option<Arc<HistoryStore>>,
    ) -> Self {
        Self {
            channels,
            settings,
            metrics,
            history,
            active: Mutex::new(HashMap::new()),
            last_fired: Mutex::new(HashMap::new()),
            known_combos: Mutex::new(HashSet::new()),
        }
    }

    /// Fire an alert: dedupe, record, dispatch to every channel.
    ///
    /// With alerting disabled, no new fires happen but the existing active
    /// set is retained (and may still resolve).
    pub async fn fire(&self, alert: Alert) {
        if !self.settings.get().alerts_enabled {
            debug!(fingerprint = %alert.fingerprint(), "alerting disabled, suppressing");
            return;
        }

        let fingerprint = alert.fingerprint();
        let dedupe_window_ms = self.settings.get().dedupe_window.as_millis() as u64;
        {
            let mut last = self.last_fired.lock();
            if let Some(prev) = last.get(&fingerprint) {
                if alert.timestamp_ms.saturating_sub(*prev) < dedupe_window_ms {
                    debug!(fingerprint = %fingerprint, "suppressed by dedupe window");
                    return;
                }
            }
            last.insert(fingerprint.clone(), alert.timestamp_ms);
        }

        self.active.lock().insert(fingerprint.clone(), alert.clone());
        self.metrics.inc_counter(
            "alerts_fired_total",
            &[
                &alert.alert_type.to_string(),
                &alert.severity.to_string(),
                &alert.service,
            ],
            1.0,
        );
        self.refresh_active_gauge();

        if let Some(history) = &self.history {
            let record = AlertRecord {
                timestamp_ms: alert.timestamp_ms,
                alert_type: alert.alert_type,
                severity: alert.severity,
                service: alert.service.clone(),
                message: alert.message.clone(),
                resolved: false,
                resolved_at_ms: None,
            };
            if let Err(e) = history.record_alert(&record) {
                warn!(error = %e, "failed to record alert history");
            }
        }

        // Channel errors are logged; remaining channels still get the alert.
        for channel in &self.channels {
            if let Err(e) = channel.send(&alert).await {
                warn!(channel = channel.name(), error = %e, "alert channel failed");
            }
        }
    }

    /// Resolve active availability alerts for a recovered service.
    pub fn resolve_service(&self, service: &str, now_ms: u64) {
        let resolved: Vec<Alert> = {
            let mut active = self.active.lock();
            let keys: Vec<String> = active
                .iter()
                .filter(|(_, a)| {
                    a.service == service
                        && matches!(
                            a.alert_type,
                            AlertType::ServiceDown | AlertType::HealthCheckFailed
                        )
                })
                .map(|(k, _)| k.clone())
                .collect();
            keys.iter().filter_map(|k| active.remove(k)).collect()
        };

        if resolved.is_empty() {
            return;
        }
        self.refresh_active_gauge();

        if let Some(history) = &self.history {
            for alert in &resolved {
                let record = AlertRecord {
                    timestamp_ms: alert.timestamp_ms,
                    alert_type: alert.alert_type,
                    severity: alert.severity,
                    service: alert.service.clone(),
                    message: alert.message.clone(),
                    resolved: true,
                    resolved_at_ms: Some(now_ms),
                };
                if let Err(e) = history.record_alert(&record) {
                    warn!(error = %e, "failed to record alert resolution");
                }
            }
        }
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.active.lock().values().cloned().collect();
        alerts.sort_by(|a, b| a.fingerprint().cmp(&b.fingerprint()));
        alerts
    }

    /// Recompute `alerts_active` grouped by (type, severity).
    fn refresh_active_gauge(&self) {
        let mut counts: HashMap<(AlertType, Severity), u64> = HashMap::new();
        {
            let active = self.active.lock();
            for alert in active.values() {
                *counts.entry((alert.alert_type, alert.severity)).or_default() += 1;
            }
        }
        // Zero out combos that emptied, then set the live ones.
        let mut known = self.known_combos.lock();
        for combo in known.iter() {
            if !counts.contains_key(combo) {
                self.metrics.set_gauge(
                    "alerts_active",
                    &[&combo.0.to_string(), &combo.1.to_string()],
                    0.0,
                );
            }
        }
        for (combo, count) in &counts {
            known.insert(*combo);
            self.metrics.set_gauge(
                "alerts_active",
                &[&combo.0.to_string(), &combo.1.to_string()],
                *count as f64,
            );
        }
    }
}
