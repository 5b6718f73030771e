// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervision runtime: turns (state, event) into effects.
//!
//! Handlers run *before* the event is applied to the materialized state, so
//! they see the pre-transition counters and can detect transitions by
//! combining state with the event. They are synchronous and deterministic;
//! every side effect is returned as an `Effect`.

mod batch;
mod cron;
mod orchestrator;
mod supervisor;

use crate::metrics::Metrics;
use dix_core::{Clock, Event, SettingsHandle, TimerKind};
use dix_storage::MaterializedState;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

pub struct Runtime<C: Clock> {
    state: Arc<Mutex<MaterializedState>>,
    settings: SettingsHandle,
    metrics: Arc<Metrics>,
    clock: C,
}

impl<C: Clock> Runtime<C> {
    pub fn new(
        state: Arc<Mutex<MaterializedState>>,
        settings: SettingsHandle,
        metrics: Arc<Metrics>,
        clock: C,
    ) -> Self {
        Self {
            state,
            settings,
            metrics,
            clock,
        }
    }

    pub fn state(&self) -> Arc<Mutex<MaterializedState>> {
        Arc::clone(&self.state)
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Run a closure against a read-only handler context.
    pub(crate) fn with_ctx<T>(&self, f: impl for<'a> FnOnce(HandlerCtx<'a>) -> T) -> T {
        let state = self.state.lock();
        let settings = self.settings.get();
        let ctx = HandlerCtx {
            state: &state,
            settings: &settings,
            metrics: &self.metrics,
            now_ms: self.clock.epoch_ms(),
        };
        f(ctx)
    }

    /// Decide the effects for one event against the pre-transition state.
    pub fn handle_event(&self, event: &Event) -> Vec<dix_core::Effect> {
        let effects = self.with_ctx(|ctx| self.dispatch(&ctx, event));
        debug!(event = event.name(), effects = effects.len(), "handled");
        effects
    }

    fn dispatch(&self, ctx: &HandlerCtx, event: &Event) -> Vec<dix_core::Effect> {
        match event {
            Event::FleetStarted => orchestrator::handle_fleet_started(ctx),
            Event::Ready { signal, from } => orchestrator::handle_ready(ctx, signal, from),
            Event::WaiterSatisfied { workflow } => {
                orchestrator::handle_waiter_satisfied(ctx, workflow)
            }
            Event::DependencyTimedOut {
                workflow,
                dependency,
            } => orchestrator::handle_dependency_timed_out(ctx, workflow, dependency),

            Event::StateChecked {
                workflow,
                state: proc_state,
                error,
            } => supervisor::handle_state_checked(ctx, workflow, *proc_state, error.as_deref()),
            Event::SyncChecked {
                workflow,
                synced,
                peers,
                error,
            } => supervisor::handle_sync_checked(ctx, workflow, *synced, *peers, error.as_deref()),
            Event::RestartFinished { workflow, success } => {
                supervisor::handle_restart_finished(ctx, workflow, *success)
            }
            Event::SupervisorExhausted { workflow } => {
                supervisor::handle_exhausted(ctx, workflow)
            }
            Event::ResourcesSampled {
                workflow, sample, ..
            } => supervisor::handle_resources_sampled(ctx, workflow, sample),
            Event::HttpProbed {
                service,
                healthy,
                error,
                ..
            } => supervisor::handle_http_probed(ctx, service, *healthy, error.as_deref()),

            Event::TimerFired { id } => match id.kind() {
                Some(TimerKind::Watch(wf)) => supervisor::handle_watch_timer(ctx, &wf),
                Some(TimerKind::Backoff(wf)) => supervisor::handle_backoff_timer(ctx, &wf),
                Some(TimerKind::DepTimeout(wf)) => {
                    orchestrator::handle_dep_timeout_timer(ctx, &wf)
                }
                Some(TimerKind::CronHourly) => cron::handle_hourly(ctx),
                Some(TimerKind::CronDaily) => cron::handle_daily(ctx),
                Some(TimerKind::HistoryPurge) => cron::handle_history_purge(ctx),
                None => {
                    debug!(timer = %id, "unrecognized timer");
                    Vec::new()
                }
            },

            Event::BatchRequested {
                run,
                relay,
                chain,
                start_range,
                end_range,
            } => batch::handle_requested(ctx, run, relay, chain, *start_range, *end_range),
            Event::BatchHeadResolved { run, head } => batch::handle_head_resolved(ctx, run, *head),
            Event::BatchChunkScanned {
                run,
                chunk_start,
                chunk_end,
                missing,
            } => batch::handle_chunk_scanned(ctx, run, *chunk_start, *chunk_end, missing),
            Event::BatchDispatched { run, start, len } => {
                batch::handle_dispatched(ctx, run, *start, *len)
            }
            Event::BatchDispatchDone {
                run, start, len, ..
            } => batch::handle_dispatch_done(ctx, run, *start, *len),
            Event::BatchContinued { run, next_start } => {
                debug!(%run, next_start, "batch continued as new");
                Vec::new()
            }
            Event::BatchFinished { run } => batch::handle_finished(ctx, run),

            Event::StatComputed {
                chain,
                stat,
                success,
                skipped,
                ..
            } => cron::handle_stat_computed(ctx, chain, stat, *success, *skipped),

            Event::SupervisorStarted { .. }
            | Event::WaiterStarted { .. }
            | Event::HealthUpdate { .. } => Vec::new(),

            Event::Shutdown => {
                self.metrics
                    .inc_counter("workflow_executions_total", &["infrastructure", "shutdown"], 1.0);
                Vec::new()
            }
        }
    }
}

/// Re-dispatch in-flight batch work after a restart.
pub(crate) fn reconcile_batch(ctx: &HandlerCtx, effects: &mut Vec<dix_core::Effect>) {
    batch::reconcile(ctx, effects);
}

/// Resume orchestrator progression and cron schedules after a restart.
pub(crate) fn reconcile_orchestrator(ctx: &HandlerCtx, effects: &mut Vec<dix_core::Effect>) {
    orchestrator::reconcile(ctx, effects);
}

/// Read-only context shared by the handler functions.
pub(crate) struct HandlerCtx<'a> {
    pub state: &'a MaterializedState,
    pub settings: &'a dix_core::Settings,
    pub metrics: &'a Arc<Metrics>,
    pub now_ms: u64,
}
