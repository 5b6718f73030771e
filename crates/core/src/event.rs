// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events that drive state transitions in the supervision engine.
//!
//! Every event is appended to the WAL before processing, so the sequence of
//! events *is* the durable execution history: snapshot + replay reconstructs
//! every workflow's state after a host restart.
//!
//! Serializes with `{"type": "scope:name", ...fields}` format.

use crate::health::ResourceSample;
use crate::process::ProcessState;
use crate::signal::{BatchRunId, SignalName, WorkflowId};
use crate::timer::TimerId;
use serde::{Deserialize, Serialize};

/// Events that trigger state transitions in the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- orchestration --
    /// The root orchestrator has begun a fleet run.
    #[serde(rename = "fleet:started")]
    FleetStarted,

    /// A node-supervisor workflow was created (or restarted as a new run).
    #[serde(rename = "supervisor:started")]
    SupervisorStarted { workflow: WorkflowId },

    /// A dependent-service waiter was created.
    #[serde(rename = "waiter:started")]
    WaiterStarted {
        workflow: WorkflowId,
        deps: Vec<SignalName>,
        #[serde(default)]
        required_any: bool,
    },

    /// All (or any, per `required_any`) dependencies of a waiter are satisfied.
    #[serde(rename = "waiter:satisfied")]
    WaiterSatisfied { workflow: WorkflowId },

    /// A waiter dependency was not signalled within its timeout.
    #[serde(rename = "waiter:dep-timeout")]
    DependencyTimedOut {
        workflow: WorkflowId,
        dependency: SignalName,
    },

    /// Ready signal from a supervisor to its parent. Delivered FIFO via the WAL.
    #[serde(rename = "signal:ready")]
    Ready {
        signal: SignalName,
        from: WorkflowId,
    },

    // -- node supervision --
    /// Completion of a `CheckServiceState` activity.
    #[serde(rename = "node:state-checked")]
    StateChecked {
        workflow: WorkflowId,
        state: ProcessState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Completion of a `CheckSync` activity.
    #[serde(rename = "node:sync-checked")]
    SyncChecked {
        workflow: WorkflowId,
        synced: bool,
        peers: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Completion of a `RestartService` activity.
    #[serde(rename = "node:restart-finished")]
    RestartFinished {
        workflow: WorkflowId,
        success: bool,
    },

    /// Health update propagated to the parent workflow.
    #[serde(rename = "node:health-update")]
    HealthUpdate {
        workflow: WorkflowId,
        healthy: bool,
    },

    /// The supervisor spent its restart budget; it keeps probing but will
    /// not restart again within this run.
    #[serde(rename = "node:exhausted")]
    SupervisorExhausted { workflow: WorkflowId },

    // -- probes --
    /// Completion of an HTTP endpoint probe.
    #[serde(rename = "probe:http")]
    HttpProbed {
        service: String,
        healthy: bool,
        status: u16,
        elapsed_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Completion of a resource-sampler activity.
    #[serde(rename = "probe:resources")]
    ResourcesSampled {
        workflow: WorkflowId,
        pid: u32,
        sample: ResourceSample,
    },

    // -- timers --
    #[serde(rename = "timer:fired")]
    TimerFired { id: TimerId },

    // -- batch indexing --
    #[serde(rename = "batch:requested")]
    BatchRequested {
        run: BatchRunId,
        relay: String,
        chain: String,
        start_range: i64,
        end_range: i64,
    },

    /// `GetChainHead` resolved the open-ended range.
    #[serde(rename = "batch:head-resolved")]
    BatchHeadResolved { run: BatchRunId, head: u64 },

    /// One 100k chunk was scanned; `missing` is the complement of the
    /// already-persisted IDs within the chunk.
    #[serde(rename = "batch:chunk-scanned")]
    BatchChunkScanned {
        run: BatchRunId,
        chunk_start: u64,
        chunk_end: u64,
        missing: Vec<u64>,
    },

    /// A block batch left the pending queue for a worker slot.
    #[serde(rename = "batch:dispatched")]
    BatchDispatched {
        run: BatchRunId,
        start: u64,
        len: u32,
    },

    /// A dispatched block batch (or single block) finished.
    #[serde(rename = "batch:dispatch-done")]
    BatchDispatchDone {
        run: BatchRunId,
        start: u64,
        len: u32,
        success: bool,
    },

    /// Continue-as-new marker: the run's cursor resets so history stays bounded.
    #[serde(rename = "batch:continued")]
    BatchContinued { run: BatchRunId, next_start: u64 },

    #[serde(rename = "batch:finished")]
    BatchFinished { run: BatchRunId },

    // -- periodic queries --
    /// Completion of one statistic computation.
    #[serde(rename = "stats:computed")]
    StatComputed {
        chain: String,
        stat: String,
        year: i32,
        month: u32,
        success: bool,
        #[serde(default)]
        skipped: bool,
    },

    // -- control --
    #[serde(rename = "shutdown")]
    Shutdown,
}

impl Event {
    /// Short name for logging and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Event::FleetStarted => "fleet:started",
            Event::SupervisorStarted { .. } => "supervisor:started",
            Event::WaiterStarted { .. } => "waiter:started",
            Event::WaiterSatisfied { .. } => "waiter:satisfied",
            Event::DependencyTimedOut { .. } => "waiter:dep-timeout",
            Event::Ready { .. } => "signal:ready",
            Event::StateChecked { .. } => "node:state-checked",
            Event::SyncChecked { .. } => "node:sync-checked",
            Event::RestartFinished { .. } => "node:restart-finished",
            Event::HealthUpdate { .. } => "node:health-update",
            Event::SupervisorExhausted { .. } => "node:exhausted",
            Event::HttpProbed { .. } => "probe:http",
            Event::ResourcesSampled { .. } => "probe:resources",
            Event::TimerFired { .. } => "timer:fired",
            Event::BatchRequested { .. } => "batch:requested",
            Event::BatchHeadResolved { .. } => "batch:head-resolved",
            Event::BatchChunkScanned { .. } => "batch:chunk-scanned",
            Event::BatchDispatched { .. } => "batch:dispatched",
            Event::BatchDispatchDone { .. } => "batch:dispatch-done",
            Event::BatchContinued { .. } => "batch:continued",
            Event::BatchFinished { .. } => "batch:finished",
            Event::StatComputed { .. } => "stats:computed",
            Event::Shutdown => "shutdown",
        }
    }

    /// The workflow this event belongs to, when it has one.
    pub fn workflow(&self) -> Option<&WorkflowId> {
        match self {
            Event::SupervisorStarted { workflow }
            | Event::WaiterStarted { workflow, .. }
            | Event::WaiterSatisfied { workflow }
            | Event::DependencyTimedOut { workflow, .. }
            | Event::StateChecked { workflow, .. }
            | Event::SyncChecked { workflow, .. }
            | Event::RestartFinished { workflow, .. }
            | Event::HealthUpdate { workflow, .. }
            | Event::SupervisorExhausted { workflow }
            | Event::ResourcesSampled { workflow, .. } => Some(workflow),
            Event::Ready { from, .. } => Some(from),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
