// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health, resource, and downtime record types.

use crate::alert::{AlertType, Severity};
use serde::{Deserialize, Serialize};

/// One resource-sampler reading for a process.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub disk_read_bytes_per_sec: f64,
    pub disk_write_bytes_per_sec: f64,
}

impl ResourceSample {
    /// Combined read + write throughput, used by the disk I/O alert rule.
    pub fn disk_io_total(&self) -> f64 {
        self.disk_read_bytes_per_sec + self.disk_write_bytes_per_sec
    }
}

/// Append-only record of one probe outcome, persisted to the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEvent {
    pub timestamp_ms: u64,
    pub service: String,
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced: Option<bool>,
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl HealthEvent {
    pub fn new(timestamp_ms: u64, service: impl Into<String>, service_type: impl Into<String>, healthy: bool) -> Self {
        Self {
            timestamp_ms,
            service: service.into(),
            service_type: service_type.into(),
            chain: None,
            healthy,
            active_state: None,
            sub_state: None,
            resources: None,
            peer_count: None,
            synced: None,
            restart_count: 0,
            error: None,
            metadata: serde_json::Value::Null,
        }
    }
}

/// A contiguous span of unhealthiness for one service.
///
/// Opened on the first Healthy→Unhealthy transition, resolved on the next
/// Unhealthy→Healthy with `duration = end - start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DowntimeIncident {
    pub service: String,
    pub start_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<u64>,
    #[serde(default)]
    pub duration_secs: u64,
    pub reason: String,
    pub resolved: bool,
}

/// Record of one restart attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartEvent {
    pub timestamp_ms: u64,
    pub service: String,
    pub reason: String,
    pub success: bool,
}

/// Record of one fired (or resolved) alert for the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp_ms: u64,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub service: String,
    pub message: String,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<u64>,
}
