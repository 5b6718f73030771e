// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Systemd process backend.
//!
//! Operations map onto the service bus through `systemctl`, which queues
//! unit jobs in `replace` collision mode and reports completion. Every call
//! is capped at the 30s bus ceiling. `status` parses
//! (ActiveState, SubState) from `systemctl show` into a `ProcessState`.

use super::{ProcessError, ProcessManager};
use crate::subprocess::{run_with_timeout, BUS_TIMEOUT};
use async_trait::async_trait;
use dix_core::{ProcessConfig, ProcessState, ProcessStatus};
use tokio::process::Command;
use tracing::debug;

/// Process manager backed by systemd units.
#[derive(Clone, Default)]
pub struct SystemdManager;

impl SystemdManager {
    pub fn new() -> Self {
        Self
    }

    async fn unit_op(&self, op: &str, unit: &str) -> Result<(), ProcessError> {
        let mut cmd = Command::new("systemctl");
        cmd.args([op, "--job-mode=replace", unit]);

        let output = run_with_timeout(cmd, BUS_TIMEOUT, &format!("systemctl {op} {unit}"))
            .await
            .map_err(map_bus_error)?;

        if output.status.success() {
            debug!(unit, op, "unit job done");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ProcessError::OperationFailed(format!(
                "systemctl {op} {unit}: {}",
                stderr.trim()
            )))
        }
    }

    /// Read a set of unit properties via `systemctl show`.
    async fn show(&self, unit: &str) -> Result<UnitProperties, ProcessError> {
        let mut cmd = Command::new("systemctl");
        cmd.args([
            "show",
            unit,
            "--property=ActiveState,SubState,MainPID,ExecMainStatus",
        ]);

        let output = run_with_timeout(cmd, BUS_TIMEOUT, &format!("systemctl show {unit}"))
            .await
            .map_err(map_bus_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessError::OperationFailed(format!(
                "systemctl show {unit}: {}",
                stderr.trim()
            )));
        }

        Ok(parse_show_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn map_bus_error(message: String) -> ProcessError {
    if message.contains("timed out") {
        ProcessError::Timeout(message)
    } else {
        ProcessError::OperationFailed(message)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct UnitProperties {
    active_state: String,
    sub_state: String,
    main_pid: Option<u32>,
    exec_main_status: Option<i32>,
}

/// Parse `Key=Value` lines from `systemctl show`.
fn parse_show_output(stdout: &str) -> UnitProperties {
    let mut props = UnitProperties::default();
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key {
            "ActiveState" => props.active_state = value.to_string(),
            "SubState" => props.sub_state = value.to_string(),
            "MainPID" => props.main_pid = value.parse().ok().filter(|p| *p != 0),
            "ExecMainStatus" => props.exec_main_status = value.parse().ok(),
            _ => {}
        }
    }
    props
}

#[async_trait]
impl ProcessManager for SystemdManager {
    async fn start(&self, config: &ProcessConfig) -> Result<(), ProcessError> {
        self.unit_op("start", &config.name).await
    }

    async fn stop(&self, name: &str) -> Result<(), ProcessError> {
        self.unit_op("stop", name).await
    }

    async fn restart(&self, name: &str) -> Result<(), ProcessError> {
        self.unit_op("restart", name).await
    }

    async fn status(&self, name: &str) -> Result<ProcessStatus, ProcessError> {
        let props = self.show(name).await?;
        Ok(ProcessStatus {
            name: name.to_string(),
            state: ProcessState::from_systemd(&props.active_state, &props.sub_state),
            pid: props.main_pid,
            exit_code: props.exec_main_status,
            restart_count: 0,
        })
    }

    async fn output(&self, name: &str, _lines: usize) -> Result<Vec<String>, ProcessError> {
        // Unit output lives in the journal, not with us.
        Err(ProcessError::OperationFailed(format!(
            "output capture is not available for systemd unit {name}; use journalctl"
        )))
    }

    async fn kill(&self, name: &str) -> Result<(), ProcessError> {
        self.unit_op("kill", name).await
    }

    async fn list(&self) -> Result<Vec<ProcessStatus>, ProcessError> {
        // The systemd backend tracks no unit set of its own; supervisors
        // query the units the plan names.
        Ok(Vec::new())
    }

    async fn close(&self) -> Result<(), ProcessError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "systemd"
    }
}

#[cfg(test)]
#[path = "systemd_tests.rs"]
mod tests;
