// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects: side effects the runtime asks the executor to perform.
//!
//! Handlers are synchronous and deterministic; everything that touches the
//! outside world (process manager, HTTP probes, /proc, alert channels,
//! history store, timers) is expressed as an effect. Activity completions
//! re-enter the engine as events.

use crate::alert::Alert;
use crate::health::HealthEvent;
use crate::http_probe::HttpProbeSpec;
use crate::signal::{BatchRunId, WorkflowId};
use crate::timer::TimerId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Effects that need to be executed by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    // === Event emission ===
    /// Feed an event back into the engine (durably, via the WAL).
    Emit { event: crate::event::Event },

    // === Node activities ===
    /// Query the process manager for the unit's state.
    CheckServiceState { workflow: WorkflowId, unit: String },

    /// Restart the unit via the process manager.
    RestartService { workflow: WorkflowId, unit: String },

    /// JSON-RPC `system_health` probe against the node's RPC endpoint.
    CheckSync { workflow: WorkflowId, endpoint: String },

    /// Probe an HTTP endpoint per the given spec.
    ProbeHttp { service: String, spec: HttpProbeSpec },

    /// Sample CPU/RSS/disk-IO for the unit's main process.
    SampleResources { workflow: WorkflowId, unit: String },

    // === Timers ===
    SetTimer {
        id: TimerId,
        #[serde(with = "duration_ms")]
        duration: Duration,
    },
    CancelTimer { id: TimerId },

    // === Alerting & history ===
    /// Send an alert through the dedupe pipeline and channel fan-out.
    DispatchAlert { alert: Alert },

    /// Resolve all active alerts for a service (on recovery).
    ResolveAlerts { service: String },

    /// Append a probe outcome to the health history store.
    RecordHealth { event: HealthEvent },

    /// Append a restart attempt to the history store.
    RecordRestart {
        service: String,
        reason: String,
        success: bool,
    },

    /// Drop history rows older than the cutoff and reclaim space.
    PurgeHistory { cutoff_ms: u64 },

    // === Batch indexing activities ===
    FetchChainHead {
        run: BatchRunId,
        relay: String,
        chain: String,
    },
    ScanExistingBlocks {
        run: BatchRunId,
        relay: String,
        chain: String,
        chunk_start: u64,
        chunk_end: u64,
    },
    ProcessBlockBatch {
        run: BatchRunId,
        relay: String,
        chain: String,
        start: u64,
        len: u32,
    },
    ProcessSingleBlock {
        run: BatchRunId,
        relay: String,
        chain: String,
        id: u64,
    },

    // === Periodic queries ===
    RunStat {
        chain: String,
        stat: String,
        year: i32,
        month: u32,
    },
}

impl Effect {
    /// Short name for logging and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Emit { .. } => "emit",
            Effect::CheckServiceState { .. } => "check-service-state",
            Effect::RestartService { .. } => "restart-service",
            Effect::CheckSync { .. } => "check-sync",
            Effect::ProbeHttp { .. } => "probe-http",
            Effect::SampleResources { .. } => "sample-resources",
            Effect::SetTimer { .. } => "set-timer",
            Effect::CancelTimer { .. } => "cancel-timer",
            Effect::DispatchAlert { .. } => "dispatch-alert",
            Effect::ResolveAlerts { .. } => "resolve-alerts",
            Effect::RecordHealth { .. } => "record-health",
            Effect::RecordRestart { .. } => "record-restart",
            Effect::PurgeHistory { .. } => "purge-history",
            Effect::FetchChainHead { .. } => "fetch-chain-head",
            Effect::ScanExistingBlocks { .. } => "scan-existing-blocks",
            Effect::ProcessBlockBatch { .. } => "process-block-batch",
            Effect::ProcessSingleBlock { .. } => "process-single-block",
            Effect::RunStat { .. } => "run-stat",
        }
    }

    /// Whether this effect blocks on outside I/O.
    ///
    /// The daemon runs blocking effects on the activity pool so the engine
    /// loop keeps draining events; completion re-enters as an event. Timer
    /// and emit effects are applied inline to preserve ordering.
    pub fn is_blocking(&self) -> bool {
        !matches!(
            self,
            Effect::Emit { .. } | Effect::SetTimer { .. } | Effect::CancelTimer { .. }
        )
    }
}

/// Serde helper storing durations as milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
