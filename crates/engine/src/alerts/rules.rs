// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default alert rules.
//!
//! Rules are pure: (settings, observation) → alerts. The runtime handlers
//! evaluate them at the matching state transitions and dispatch the results
//! through the manager, which owns dedupe and fan-out.

use dix_core::{Alert, AlertType, ProcessState, ResourceSample, Settings, Severity};

/// CPU / memory / disk thresholds against one resource sample.
pub fn evaluate_resources(
    settings: &Settings,
    service: &str,
    sample: &ResourceSample,
    now_ms: u64,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if sample.cpu_percent >= settings.cpu_critical_percent {
        alerts.push(Alert::new(
            AlertType::HighCpu,
            Severity::Critical,
            service,
            format!("cpu at {:.1}%", sample.cpu_percent),
            now_ms,
        ));
    } else if sample.cpu_percent >= settings.cpu_warning_percent {
        alerts.push(Alert::new(
            AlertType::HighCpu,
            Severity::Warning,
            service,
            format!("cpu at {:.1}%", sample.cpu_percent),
            now_ms,
        ));
    }

    if sample.memory_bytes >= settings.memory_critical_bytes {
        alerts.push(Alert::new(
            AlertType::HighMemory,
            Severity::Critical,
            service,
            format!("rss at {} bytes", sample.memory_bytes),
            now_ms,
        ));
    } else if sample.memory_bytes >= settings.memory_warning_bytes {
        alerts.push(Alert::new(
            AlertType::HighMemory,
            Severity::Warning,
            service,
            format!("rss at {} bytes", sample.memory_bytes),
            now_ms,
        ));
    }

    if sample.disk_io_total() >= settings.disk_io_warning_bytes_per_sec {
        alerts.push(Alert::new(
            AlertType::HighDiskIo,
            Severity::Warning,
            service,
            format!("disk io at {:.0} B/s", sample.disk_io_total()),
            now_ms,
        ));
    }

    alerts
}

/// Restart-loop detection: the budget is being eaten.
pub fn evaluate_restart_loop(
    settings: &Settings,
    service: &str,
    restart_count: u32,
    now_ms: u64,
) -> Option<Alert> {
    (restart_count >= settings.restart_loop_threshold).then(|| {
        Alert::new(
            AlertType::RestartLoop,
            Severity::Warning,
            service,
            format!("{restart_count} restarts without recovery"),
            now_ms,
        )
    })
}

/// Service-down: the unit is not active.
pub fn evaluate_service_down(
    service: &str,
    state: ProcessState,
    error: Option<&str>,
    now_ms: u64,
) -> Option<Alert> {
    if state.is_active() && error.is_none() {
        return None;
    }
    let message = match error {
        Some(e) => format!("state check failed: {e}"),
        None => format!("unit is {state}"),
    };
    Some(Alert::new(
        AlertType::ServiceDown,
        Severity::Critical,
        service,
        message,
        now_ms,
    ))
}

/// HTTP probe reported unhealthy.
pub fn evaluate_http_failure(
    service: &str,
    healthy: bool,
    error: Option<&str>,
    now_ms: u64,
) -> Option<Alert> {
    (!healthy).then(|| {
        Alert::new(
            AlertType::HealthCheckFailed,
            Severity::Warning,
            service,
            format!("health check failed: {}", error.unwrap_or("unhealthy")),
            now_ms,
        )
    })
}

/// Peer count below the configured floor.
pub fn evaluate_low_peers(
    settings: &Settings,
    service: &str,
    peers: u32,
    now_ms: u64,
) -> Option<Alert> {
    (peers < settings.low_peer_threshold).then(|| {
        Alert::new(
            AlertType::LowPeerCount,
            Severity::Warning,
            service,
            format!("only {peers} peers"),
            now_ms,
        )
    })
}

/// A waiter dependency did not signal within its timeout.
pub fn dependency_timeout(service: &str, dependency: &str, now_ms: u64) -> Alert {
    Alert::new(
        AlertType::DependencyTimeout,
        Severity::Warning,
        service,
        format!("dependency {dependency} not ready in time"),
        now_ms,
    )
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
