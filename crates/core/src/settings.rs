// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide runtime settings with change-callback fan-out.
//!
//! Settings hold the alert thresholds, feature flags, breaker defaults and
//! retention knobs that may be mutated at runtime through the control API.
//! Updates are all-or-nothing: the first invalid key rejects the whole merge
//! and the previous snapshot stays active.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown setting: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runtime-tunable settings snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    // Alert thresholds
    pub cpu_warning_percent: f64,
    pub cpu_critical_percent: f64,
    pub memory_warning_bytes: u64,
    pub memory_critical_bytes: u64,
    pub disk_io_warning_bytes_per_sec: f64,
    pub restart_loop_threshold: u32,
    pub low_peer_threshold: u32,

    // Feature flags
    pub alerts_enabled: bool,
    pub resource_monitoring_enabled: bool,
    pub circuit_breaker_enabled: bool,

    // Circuit breaker defaults
    pub breaker_max_failures: u32,
    #[serde(with = "duration_str")]
    pub breaker_timeout: Duration,
    pub breaker_half_open_requests: u32,

    // Alerting
    #[serde(with = "duration_str")]
    pub dedupe_window: Duration,

    // Dependency waits
    #[serde(with = "duration_str")]
    pub dependency_timeout: Duration,

    // Metrics
    pub metrics_port: u16,
    pub metrics_namespace: String,

    // History
    pub history_retention_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cpu_warning_percent: 80.0,
            cpu_critical_percent: 95.0,
            memory_warning_bytes: 2 * GIB,
            memory_critical_bytes: 4 * GIB,
            disk_io_warning_bytes_per_sec: 100.0 * MIB,
            restart_loop_threshold: 3,
            low_peer_threshold: 3,
            alerts_enabled: true,
            resource_monitoring_enabled: true,
            circuit_breaker_enabled: true,
            breaker_max_failures: 5,
            breaker_timeout: Duration::from_secs(60),
            breaker_half_open_requests: 3,
            dedupe_window: Duration::from_secs(300),
            dependency_timeout: Duration::from_secs(24 * 3600),
            metrics_port: 9090,
            metrics_namespace: String::new(),
            history_retention_days: 30,
        }
    }
}

impl Settings {
    /// Apply one key from a JSON merge body, validating the type.
    pub fn set_key(&mut self, key: &str, value: &serde_json::Value) -> Result<(), SettingsError> {
        match key {
            "cpu_warning_percent" => self.cpu_warning_percent = as_f64(key, value)?,
            "cpu_critical_percent" => self.cpu_critical_percent = as_f64(key, value)?,
            "memory_warning_bytes" => self.memory_warning_bytes = as_u64(key, value)?,
            "memory_critical_bytes" => self.memory_critical_bytes = as_u64(key, value)?,
            "disk_io_warning_bytes_per_sec" => {
                self.disk_io_warning_bytes_per_sec = as_f64(key, value)?
            }
            "restart_loop_threshold" => self.restart_loop_threshold = as_u32(key, value)?,
            "low_peer_threshold" => self.low_peer_threshold = as_u32(key, value)?,
            "alerts_enabled" => self.alerts_enabled = as_bool(key, value)?,
            "resource_monitoring_enabled" => {
                self.resource_monitoring_enabled = as_bool(key, value)?
            }
            "circuit_breaker_enabled" => self.circuit_breaker_enabled = as_bool(key, value)?,
            "breaker_max_failures" => self.breaker_max_failures = as_u32(key, value)?,
            "breaker_timeout" => self.breaker_timeout = as_duration(key, value)?,
            "breaker_half_open_requests" => self.breaker_half_open_requests = as_u32(key, value)?,
            "dedupe_window" => self.dedupe_window = as_duration(key, value)?,
            "dependency_timeout" => self.dependency_timeout = as_duration(key, value)?,
            "metrics_port" => self.metrics_port = as_u16(key, value)?,
            "metrics_namespace" => self.metrics_namespace = as_string(key, value)?,
            "history_retention_days" => self.history_retention_days = as_u32(key, value)?,
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Save as pretty JSON, atomically (write to .tmp, then rename).
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

type ChangeCallback = Arc<dyn Fn(&Settings, &Settings) + Send + Sync>;

/// Shared handle to the live settings with registered change callbacks.
#[derive(Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
    callbacks: Arc<RwLock<Vec<ChangeCallback>>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
            callbacks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Current snapshot (by value; the live copy may move on).
    pub fn get(&self) -> Settings {
        self.inner.read().clone()
    }

    /// Register a callback invoked with (old, new) after every successful update.
    pub fn on_change(&self, cb: impl Fn(&Settings, &Settings) + Send + Sync + 'static) {
        self.callbacks.write().push(Arc::new(cb));
    }

    /// Merge a JSON object into the settings.
    ///
    /// Every key is validated against a staged copy first; the first invalid
    /// key fails the whole update without partial application.
    pub fn update(
        &self,
        merge: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), SettingsError> {
        let old = self.get();
        let mut staged = old.clone();
        for (key, value) in merge {
            staged.set_key(key, value)?;
        }
        *self.inner.write() = staged.clone();
        for cb in self.callbacks.read().iter() {
            cb(&old, &staged);
        }
        Ok(())
    }

    /// Read a JSON file and delegate to the update path.
    pub fn reload_from_file(&self, path: &Path) -> Result<(), SettingsError> {
        let data = std::fs::read(path)?;
        let value: serde_json::Value = serde_json::from_slice(&data)?;
        let map = value.as_object().ok_or_else(|| SettingsError::InvalidValue {
            key: path.display().to_string(),
            message: "expected a JSON object".to_string(),
        })?;
        self.update(map)
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

fn as_bool(key: &str, v: &serde_json::Value) -> Result<bool, SettingsError> {
    v.as_bool().ok_or_else(|| invalid(key, "expected a boolean"))
}

fn as_f64(key: &str, v: &serde_json::Value) -> Result<f64, SettingsError> {
    v.as_f64().ok_or_else(|| invalid(key, "expected a number"))
}

fn as_u64(key: &str, v: &serde_json::Value) -> Result<u64, SettingsError> {
    v.as_u64().ok_or_else(|| invalid(key, "expected a non-negative integer"))
}

fn as_u32(key: &str, v: &serde_json::Value) -> Result<u32, SettingsError> {
    let n = as_u64(key, v)?;
    u32::try_from(n).map_err(|_| invalid(key, "value out of range"))
}

fn as_u16(key: &str, v: &serde_json::Value) -> Result<u16, SettingsError> {
    let n = as_u64(key, v)?;
    u16::try_from(n).map_err(|_| invalid(key, "value out of range"))
}

fn as_string(key: &str, v: &serde_json::Value) -> Result<String, SettingsError> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(key, "expected a string"))
}

fn as_duration(key: &str, v: &serde_json::Value) -> Result<Duration, SettingsError> {
    let s = v.as_str().ok_or_else(|| invalid(key, "expected a duration string like \"60s\""))?;
    duration_str::parse(s).ok_or_else(|| invalid(key, "expected a duration string like \"60s\""))
}

fn invalid(key: &str, message: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Durations serialized as strings: `"500ms"`, `"60s"`, `"5m"`, `"24h"`.
pub mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn format(d: &Duration) -> String {
        let ms = d.as_millis();
        if ms % 1000 != 0 {
            return format!("{ms}ms");
        }
        let secs = d.as_secs();
        if secs % 3600 == 0 && secs != 0 {
            format!("{}h", secs / 3600)
        } else if secs % 60 == 0 && secs != 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{secs}s")
        }
    }

    pub fn parse(s: &str) -> Option<Duration> {
        let s = s.trim();
        if let Some(num) = s.strip_suffix("ms") {
            return num.trim().parse::<u64>().ok().map(Duration::from_millis);
        }
        let (num, unit) = s.split_at(s.len().checked_sub(1)?);
        let n: u64 = num.trim().parse().ok()?;
        match unit {
            "s" => Some(Duration::from_secs(n)),
            "m" => Some(Duration::from_secs(n * 60)),
            "h" => Some(Duration::from_secs(n * 3600)),
            _ => None,
        }
    }

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(d)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {s}")))
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
