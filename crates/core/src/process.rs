// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process lifecycle types shared by the process-manager backends.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Observed state of a managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Running,
    Starting,
    Stopping,
    Stopped,
    Failed,
    Unknown,
}

crate::simple_display! {
    ProcessState {
        Running => "running",
        Starting => "starting",
        Stopping => "stopping",
        Stopped => "stopped",
        Failed => "failed",
        Unknown => "unknown",
    }
}

impl ProcessState {
    /// Map a systemd (ActiveState, SubState) pair onto a `ProcessState`.
    pub fn from_systemd(active_state: &str, sub_state: &str) -> Self {
        match active_state {
            "active" if sub_state == "running" => ProcessState::Running,
            "active" => ProcessState::Starting,
            "activating" => ProcessState::Starting,
            "deactivating" => ProcessState::Stopping,
            "inactive" => ProcessState::Stopped,
            "failed" => ProcessState::Failed,
            _ => ProcessState::Unknown,
        }
    }

    /// Whether the unit counts as healthy for supervision purposes.
    pub fn is_active(&self) -> bool {
        matches!(self, ProcessState::Running | ProcessState::Starting)
    }
}

/// Restart policy applied by the direct backend's lifecycle monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    #[default]
    Never,
    OnFailure,
    Always,
}

crate::simple_display! {
    RestartPolicy {
        Never => "never",
        OnFailure => "on-failure",
        Always => "always",
    }
}

/// Configuration for a directly-managed child process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Uid/gid to run as; applied only when the supervisor is privileged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(default)]
    pub capture_output: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    #[serde(default)]
    pub max_restarts: u32,
    /// Delay before an automatic restart (default 5s).
    #[serde(default = "default_restart_delay", with = "crate::descriptor::duration_secs")]
    pub restart_delay: Duration,
}

fn default_restart_delay() -> Duration {
    Duration::from_secs(5)
}

impl ProcessConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            uid: None,
            gid: None,
            capture_output: false,
            log_file: None,
            restart_policy: RestartPolicy::Never,
            max_restarts: 0,
            restart_delay: default_restart_delay(),
        }
    }

    crate::setters! {
        set {
            capture_output: bool,
            restart_policy: RestartPolicy,
            max_restarts: u32,
            restart_delay: Duration,
        }
        option {
            cwd: PathBuf,
            log_file: PathBuf,
        }
    }
}

/// Status snapshot returned by `ProcessManager::status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStatus {
    pub name: String,
    pub state: ProcessState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub restart_count: u32,
}
