// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-service supervisor state machine.

use crate::descriptor::NodeDescriptor;
use serde::{Deserialize, Serialize};

/// Phase of a node supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorPhase {
    /// First iteration has not yet observed a healthy unit.
    Starting,
    Healthy,
    /// Probe failed or the unit is inactive; restart budget not yet spent.
    Degraded,
    /// A restart has been issued and its outcome is pending.
    Restarting,
    /// Restart budget spent. The supervisor keeps probing and reporting but
    /// never issues another restart within this run.
    Exhausted,
}

crate::simple_display! {
    SupervisorPhase {
        Starting => "starting",
        Healthy => "healthy",
        Degraded => "degraded",
        Restarting => "restarting",
        Exhausted => "exhausted",
    }
}

/// Durable state owned by one node-supervisor workflow.
///
/// Mutated only by `MaterializedState::apply_event`, so WAL replay
/// reconstructs it exactly after a host restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorState {
    pub descriptor: NodeDescriptor,
    pub phase: SupervisorPhase,
    pub restart_count: u32,
    pub consecutive_failures: u32,
    /// Epoch ms of the last healthy observation (0 before the first).
    pub last_healthy_at_ms: u64,
    /// Epoch ms when the service was last seen entering an unhealthy state
    /// (0 while healthy). Drives downtime accounting on recovery.
    pub unhealthy_since_ms: u64,
    /// Write-once per run: set when the ready signal is emitted.
    pub ready_emitted: bool,
    /// Increments each time the workflow is restarted as a new run,
    /// re-arming the ready signal.
    pub run_id: u64,
}

impl SupervisorState {
    pub fn new(descriptor: NodeDescriptor) -> Self {
        Self {
            descriptor,
            phase: SupervisorPhase::Starting,
            restart_count: 0,
            consecutive_failures: 0,
            last_healthy_at_ms: 0,
            unhealthy_since_ms: 0,
            ready_emitted: false,
            run_id: 1,
        }
    }

    /// Whether the restart budget still allows another restart.
    pub fn can_restart(&self) -> bool {
        self.phase != SupervisorPhase::Exhausted && self.restart_count < self.descriptor.max_restarts
    }

    /// Begin a fresh run: counters and the ready latch reset, identity kept.
    pub fn start_new_run(&mut self) {
        self.run_id += 1;
        self.phase = SupervisorPhase::Starting;
        self.restart_count = 0;
        self.consecutive_failures = 0;
        self.ready_emitted = false;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
