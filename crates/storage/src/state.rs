// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay.
//!
//! `apply_event` is the single place workflow state mutates. The engine's
//! handlers only read this state and return effects, so snapshot + replay
//! reconstructs every supervisor's counters, ready latches, waiter progress
//! and batch cursors exactly after a host restart.
//!
//! Timestamps recorded here are advisory (they come from the caller's
//! clock); counters and latches are the replay-critical parts.

use dix_core::{Event, SignalName, SupervisorPhase, SupervisorState, WorkflowId};
use dix_plan::FleetPlan;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

/// State of one dependent-service waiter workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaiterState {
    pub workflow: WorkflowId,
    pub deps: Vec<SignalName>,
    #[serde(default)]
    pub required_any: bool,
    /// Signals received so far (timed-out dependencies count as received).
    #[serde(default)]
    pub received: HashSet<SignalName>,
    #[serde(default)]
    pub timed_out: HashSet<SignalName>,
    #[serde(default)]
    pub satisfied: bool,
    /// Epoch ms when the wait began; drives the timeout re-arm on restart.
    #[serde(default)]
    pub started_at_ms: u64,
}

impl WaiterState {
    /// Whether the dependency set is satisfied.
    pub fn deps_met(&self) -> bool {
        if self.required_any {
            !self.received.is_empty()
        } else {
            self.deps.iter().all(|d| self.received.contains(d))
        }
    }
}

/// Bookkeeping for the root orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub running: bool,
    /// Every ready signal observed, in delivery order.
    #[serde(default)]
    pub signal_log: Vec<SignalName>,
    #[serde(default)]
    pub seen: HashSet<SignalName>,
}

impl OrchestratorState {
    pub fn has_seen(&self, signal: &SignalName) -> bool {
        self.seen.contains(signal)
    }

    pub fn has_seen_all<'a>(&self, signals: impl IntoIterator<Item = &'a SignalName>) -> bool {
        signals.into_iter().all(|s| self.seen.contains(s))
    }
}

/// Durable cursor of one batch indexing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunState {
    pub relay: String,
    pub chain: String,
    pub start_range: u64,
    /// Negative until the head activity resolves an open-ended range.
    pub end_range: i64,
    /// Start of the next 100k chunk to scan.
    pub next_chunk_start: u64,
    /// Continuous batches awaiting dispatch, left to right.
    #[serde(default)]
    pub pending: VecDeque<(u64, u32)>,
    /// Dispatched batches whose completion is outstanding. Re-dispatched on
    /// recovery (activities are at-least-once).
    #[serde(default)]
    pub in_flight: Vec<(u64, u32)>,
    /// Blocks processed since the last continue-as-new.
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub finished: bool,
    pub batch_size: u32,
    pub max_workers: u32,
    /// Epoch ms when the run was requested (advisory).
    #[serde(default)]
    pub started_at_ms: u64,
}

impl BatchRunState {
    /// The resolved inclusive end of the range, once known.
    pub fn resolved_end(&self) -> Option<u64> {
        (self.end_range >= 0).then_some(self.end_range as u64)
    }
}

/// Materialized state rebuilt from snapshot + WAL replay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    /// The fleet plan, injected at startup from configuration (not replayed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<FleetPlan>,
    pub supervisors: HashMap<WorkflowId, SupervisorState>,
    pub waiters: HashMap<WorkflowId, WaiterState>,
    pub orchestrator: OrchestratorState,
    pub batch_runs: HashMap<dix_core::BatchRunId, BatchRunState>,
}

impl MaterializedState {
    pub fn set_plan(&mut self, plan: FleetPlan) {
        self.plan = Some(plan);
    }

    pub fn supervisor(&self, workflow: &WorkflowId) -> Option<&SupervisorState> {
        self.supervisors.get(workflow)
    }

    /// Apply an event. `now_ms` stamps the advisory timestamp fields.
    pub fn apply_event(&mut self, event: &Event, now_ms: u64) {
        match event {
            Event::FleetStarted => {
                self.orchestrator.running = true;
            }

            Event::SupervisorStarted { workflow } => {
                if let Some(existing) = self.supervisors.get_mut(workflow) {
                    existing.start_new_run();
                    return;
                }
                let Some(descriptor) = self
                    .plan
                    .as_ref()
                    .and_then(|p| p.descriptor(workflow).cloned())
                else {
                    warn!(%workflow, "supervisor started for unknown workflow, ignoring");
                    return;
                };
                self.supervisors
                    .insert(workflow.clone(), SupervisorState::new(descriptor));
            }

            Event::WaiterStarted {
                workflow,
                deps,
                required_any,
            } => {
                self.waiters.entry(workflow.clone()).or_insert(WaiterState {
                    workflow: workflow.clone(),
                    deps: deps.clone(),
                    required_any: *required_any,
                    received: HashSet::new(),
                    timed_out: HashSet::new(),
                    satisfied: false,
                    started_at_ms: now_ms,
                });
            }

            Event::WaiterSatisfied { workflow } => {
                if let Some(w) = self.waiters.get_mut(workflow) {
                    w.satisfied = true;
                }
            }

            Event::DependencyTimedOut {
                workflow,
                dependency,
            } => {
                if let Some(w) = self.waiters.get_mut(workflow) {
                    w.timed_out.insert(dependency.clone());
                    // A timed-out dependency no longer blocks progression.
                    w.received.insert(dependency.clone());
                }
            }

            Event::Ready { signal, from } => {
                self.orchestrator.signal_log.push(signal.clone());
                self.orchestrator.seen.insert(signal.clone());
                if let Some(sup) = self.supervisors.get_mut(from) {
                    sup.ready_emitted = true;
                }
                for w in self.waiters.values_mut() {
                    if !w.satisfied && w.deps.contains(signal) {
                        w.received.insert(signal.clone());
                    }
                }
            }

            Event::StateChecked {
                workflow,
                state,
                error,
            } => {
                let Some(sup) = self.supervisors.get_mut(workflow) else {
                    return;
                };
                let healthy = error.is_none() && state.is_active();
                if healthy {
                    if sup.phase != SupervisorPhase::Healthy {
                        // Recovery resets both failure tracking and the
                        // restart budget, Exhausted included.
                        sup.consecutive_failures = 0;
                        sup.restart_count = 0;
                    }
                    sup.phase = SupervisorPhase::Healthy;
                    sup.last_healthy_at_ms = now_ms;
                    sup.unhealthy_since_ms = 0;
                } else {
                    sup.consecutive_failures += 1;
                    if sup.unhealthy_since_ms == 0 {
                        sup.unhealthy_since_ms = now_ms;
                    }
                    if sup.phase != SupervisorPhase::Exhausted {
                        sup.phase = SupervisorPhase::Degraded;
                    }
                }
            }

            Event::RestartFinished { workflow, .. } => {
                if let Some(sup) = self.supervisors.get_mut(workflow) {
                    sup.restart_count += 1;
                    if sup.phase != SupervisorPhase::Exhausted {
                        sup.phase = SupervisorPhase::Restarting;
                    }
                }
            }

            Event::SupervisorExhausted { workflow } => {
                if let Some(sup) = self.supervisors.get_mut(workflow) {
                    sup.phase = SupervisorPhase::Exhausted;
                }
            }

            // Probe completions and health updates carry no durable state.
            Event::SyncChecked { .. }
            | Event::HealthUpdate { .. }
            | Event::HttpProbed { .. }
            | Event::ResourcesSampled { .. }
            | Event::TimerFired { .. }
            | Event::StatComputed { .. } => {}

            Event::BatchRequested {
                run,
                relay,
                chain,
                start_range,
                end_range,
            } => {
                let (batch_size, max_workers) = self
                    .plan
                    .as_ref()
                    .map(|p| (p.batch.batch_size, p.batch.max_workers))
                    .unwrap_or((100, 4));
                self.batch_runs.entry(run.clone()).or_insert(BatchRunState {
                    relay: relay.clone(),
                    chain: chain.clone(),
                    start_range: (*start_range).max(0) as u64,
                    end_range: *end_range,
                    next_chunk_start: (*start_range).max(0) as u64,
                    pending: VecDeque::new(),
                    in_flight: Vec::new(),
                    processed: 0,
                    finished: false,
                    batch_size,
                    max_workers,
                    started_at_ms: now_ms,
                });
            }

            Event::BatchHeadResolved { run, head } => {
                if let Some(r) = self.batch_runs.get_mut(run) {
                    r.end_range = *head as i64;
                }
            }

            Event::BatchChunkScanned {
                run,
                chunk_end,
                missing,
                ..
            } => {
                if let Some(r) = self.batch_runs.get_mut(run) {
                    r.next_chunk_start = chunk_end.saturating_add(1);
                    for batch in partition_batches(missing, r.batch_size) {
                        r.pending.push_back(batch);
                    }
                }
            }

            Event::BatchDispatched { run, start, len } => {
                if let Some(r) = self.batch_runs.get_mut(run) {
                    if let Some(pos) = r
                        .pending
                        .iter()
                        .position(|(s, l)| s == start && l == len)
                    {
                        r.pending.remove(pos);
                    }
                    // Idempotent under duplicate dispatch.
                    if !r.in_flight.contains(&(*start, *len)) {
                        r.in_flight.push((*start, *len));
                    }
                }
            }

            Event::BatchDispatchDone {
                run, start, len, ..
            } => {
                if let Some(r) = self.batch_runs.get_mut(run) {
                    // Stale completions (duplicate dispatch) don't count twice.
                    if let Some(pos) =
                        r.in_flight.iter().position(|(s, l)| s == start && l == len)
                    {
                        r.in_flight.remove(pos);
                        r.processed += u64::from(*len);
                    }
                }
            }

            Event::BatchContinued { run, next_start } => {
                if let Some(r) = self.batch_runs.get_mut(run) {
                    r.processed = 0;
                    r.start_range = *next_start;
                }
            }

            Event::BatchFinished { run } => {
                if let Some(r) = self.batch_runs.get_mut(run) {
                    r.finished = true;
                }
            }

            Event::Shutdown => {
                self.orchestrator.running = false;
            }
        }
    }

}

/// Partition sorted missing block IDs into continuous batches.
///
/// Walks the list, extending a batch while IDs are consecutive and the batch
/// is shorter than `batch_size`; otherwise starts a new batch.
pub fn partition_batches(missing: &[u64], batch_size: u32) -> Vec<(u64, u32)> {
    let batch_size = batch_size.max(1);
    let mut out: Vec<(u64, u32)> = Vec::new();
    for &id in missing {
        match out.last_mut() {
            Some((start, len)) if *start + u64::from(*len) == id && *len < batch_size => {
                *len += 1;
            }
            _ => out.push((id, 1)),
        }
    }
    out
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
