// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line surface of the supervisor.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Process manager backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ManagerKind {
    #[default]
    Systemd,
    Direct,
}

/// dixsup — supervisory orchestrator for the dix indexer fleet.
#[derive(Debug, Parser)]
#[command(name = "dixsup", version, about)]
pub struct Args {
    /// Fleet configuration file.
    #[arg(long)]
    pub conf: PathBuf,

    /// Dry run: log state-changing actions and skip them.
    #[arg(long, conflicts_with = "exec", required_unless_present = "exec")]
    pub watch: bool,

    /// Execute state-changing actions.
    #[arg(long, conflicts_with = "watch", required_unless_present = "watch")]
    pub exec: bool,

    /// Engine namespace (isolates the state directory).
    #[arg(long, default_value = "dotidx")]
    pub namespace: String,

    /// State directory override (default: $XDG_STATE_HOME/dixsup/<namespace>).
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Serve Prometheus metrics.
    #[arg(long)]
    pub metrics: bool,

    #[arg(long, default_value_t = 9090)]
    pub metrics_port: u16,

    /// Enable the alerting pipeline.
    #[arg(long)]
    pub alerts: bool,

    /// Chat webhook URL (Slack-compatible attachments).
    #[arg(long)]
    pub slack_webhook: Option<String>,

    /// Generic webhook URL (flat JSON payloads).
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Sample CPU/RSS/disk-IO for healthy services.
    #[arg(long)]
    pub resource_monitoring: bool,

    /// Guard upstream probes with circuit breakers.
    #[arg(long)]
    pub circuit_breaker: bool,

    /// Persist health history for SLO reporting.
    #[arg(long)]
    pub health_history: bool,

    /// History database directory (default: <state-dir>/history).
    #[arg(long)]
    pub health_history_db: Option<PathBuf>,

    /// Serve the dynamic-config control API.
    #[arg(long)]
    pub dynamic_config: bool,

    #[arg(long, default_value_t = 9091)]
    pub config_port: u16,

    /// Process manager backend.
    #[arg(long, value_enum, default_value_t = ManagerKind::Systemd)]
    pub process_manager: ManagerKind,

    /// Log directory for direct-managed processes.
    #[arg(long)]
    pub process_log_dir: Option<PathBuf>,

    /// PID file directory for direct-managed processes.
    #[arg(long)]
    pub process_pid_dir: Option<PathBuf>,

    /// Default restart budget for direct-managed processes.
    #[arg(long, default_value_t = 3)]
    pub process_max_restarts: u32,
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
