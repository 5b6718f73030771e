// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert types and the dedupe fingerprint.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed enumeration of alert types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ServiceDown,
    ServiceDegraded,
    HighCpu,
    HighMemory,
    HighDiskIo,
    RestartLoop,
    SyncStalled,
    LowPeerCount,
    DependencyTimeout,
    HealthCheckFailed,
}

crate::simple_display! {
    AlertType {
        ServiceDown => "service_down",
        ServiceDegraded => "service_degraded",
        HighCpu => "high_cpu",
        HighMemory => "high_memory",
        HighDiskIo => "high_disk_io",
        RestartLoop => "restart_loop",
        SyncStalled => "sync_stalled",
        LowPeerCount => "low_peer_count",
        DependencyTimeout => "dependency_timeout",
        HealthCheckFailed => "health_check_failed",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

crate::simple_display! {
    Severity {
        Info => "info",
        Warning => "warning",
        Critical => "critical",
    }
}

/// A single alert instance flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub service: String,
    pub message: String,
    /// Epoch milliseconds when the alert was raised.
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
}

impl Alert {
    pub fn new(
        alert_type: AlertType,
        severity: Severity,
        service: impl Into<String>,
        message: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            alert_type,
            severity,
            service: service.into(),
            message: message.into(),
            timestamp_ms,
            labels: HashMap::new(),
            annotations: HashMap::new(),
        }
    }

    /// Dedupe key: two alerts with the same fingerprint within the dedupe
    /// window collapse to one fire.
    pub fn fingerprint(&self) -> String {
        format!("{}|{}|{}", self.alert_type, self.service, self.severity)
    }
}

#[cfg(test)]
#[path = "alert_tests.rs"]
mod tests;
