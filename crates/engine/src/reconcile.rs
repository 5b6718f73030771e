// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup reconciliation: re-arm the timers and in-flight work implied by
//! the materialized state.
//!
//! Timers are in-memory, so after snapshot + WAL replay every durable
//! sleep must be reconstructed: watch ticks for live supervisors,
//! dependency timeouts for pending waiters, cron schedules, and the
//! retention purge. Batch activities are at-least-once; anything that was
//! in flight at the crash is re-dispatched.

use crate::runtime::Runtime;
use dix_core::{Clock, Effect, Event, TimerId};
use std::time::Duration;
use tracing::info;

impl<C: Clock> Runtime<C> {
    /// Effects that resume the fleet after a restart.
    pub fn reconcile(&self) -> Vec<Effect> {
        self.with_ctx(|ctx| {
            let mut effects = Vec::new();

            // Every supervisor probes again immediately; its counters
            // survived replay.
            for workflow in ctx.state.supervisors.keys() {
                effects.push(Effect::SetTimer {
                    id: TimerId::watch(workflow),
                    duration: Duration::ZERO,
                });
            }

            // Pending waiters resume with their remaining timeout; waiters
            // that crashed between satisfaction and the supervisor start
            // proceed now.
            for waiter in ctx.state.waiters.values() {
                if waiter.satisfied {
                    if !ctx.state.supervisors.contains_key(&waiter.workflow) {
                        effects.push(Effect::Emit {
                            event: Event::SupervisorStarted {
                                workflow: waiter.workflow.clone(),
                            },
                        });
                        effects.push(Effect::SetTimer {
                            id: TimerId::watch(&waiter.workflow),
                            duration: Duration::ZERO,
                        });
                    }
                    continue;
                }
                if waiter.deps_met() {
                    effects.push(Effect::Emit {
                        event: Event::WaiterSatisfied {
                            workflow: waiter.workflow.clone(),
                        },
                    });
                    continue;
                }
                let deadline_ms = waiter.started_at_ms
                    + ctx.settings.dependency_timeout.as_millis() as u64;
                let remaining = deadline_ms.saturating_sub(ctx.now_ms).max(1000);
                effects.push(Effect::SetTimer {
                    id: TimerId::dep_timeout(&waiter.workflow),
                    duration: Duration::from_millis(remaining),
                });
            }

            crate::runtime::reconcile_batch(&ctx, &mut effects);
            crate::runtime::reconcile_orchestrator(&ctx, &mut effects);

            info!(effects = effects.len(), "startup reconciliation prepared");
            effects
        })
    }
}
