// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root orchestrator and dependent-service waiters.
//!
//! The fleet starts in strict topological phases: all relays, then their
//! parachains, then every sidecar, then the proxy, then the application
//! services. Phases advance on ready-signal delivery; dependent services
//! are wrapped in waiter workflows that block on their dependency set with
//! a bounded timeout.

use super::supervisor::IMMEDIATE;
use super::HandlerCtx;
use crate::alerts::rules;
use dix_core::{Effect, Event, SignalName, TimerId, WorkflowId};
use dix_plan::FleetPlan;
use std::collections::HashSet;
use tracing::{info, warn};

pub(crate) fn handle_fleet_started(ctx: &HandlerCtx) -> Vec<Effect> {
    let Some(plan) = &ctx.state.plan else {
        warn!("fleet started without a plan");
        return Vec::new();
    };
    ctx.metrics
        .inc_counter("workflow_executions_total", &["infrastructure", "started"], 1.0);

    let mut effects = Vec::new();

    // Phase 1: every relay supervisor.
    for relay in &plan.relays {
        let workflow = WorkflowId::relay(&relay.relay);
        start_supervisor(ctx, &workflow, &mut effects);
    }

    // Degenerate plans (no relays) advance straight through the phases.
    let seen: HashSet<SignalName> = ctx.state.orchestrator.seen.clone();
    advance_phases(ctx, plan, &seen, &mut effects);

    // Engine-native cron schedules and the retention purge.
    effects.extend(crate::runtime::cron::arm_schedules(ctx));

    effects
}

/// Ready-signal delivery: satisfy waiters and advance the fleet phases.
pub(crate) fn handle_ready(
    ctx: &HandlerCtx,
    signal: &SignalName,
    from: &WorkflowId,
) -> Vec<Effect> {
    info!(%signal, %from, "ready signal");
    let Some(plan) = &ctx.state.plan else {
        return Vec::new();
    };

    let mut effects = Vec::new();

    // Waiters watching this signal (pre-transition: add it ourselves).
    for waiter in ctx.state.waiters.values() {
        if waiter.satisfied || !waiter.deps.contains(signal) {
            continue;
        }
        let mut received = waiter.received.clone();
        received.insert(signal.clone());
        let met = if waiter.required_any {
            !received.is_empty()
        } else {
            waiter.deps.iter().all(|d| received.contains(d))
        };
        if met {
            effects.push(Effect::Emit {
                event: Event::WaiterSatisfied {
                    workflow: waiter.workflow.clone(),
                },
            });
        }
    }

    // Orchestrator phase progression with this signal included.
    let mut seen = ctx.state.orchestrator.seen.clone();
    seen.insert(signal.clone());
    advance_phases(ctx, plan, &seen, &mut effects);

    effects
}

/// A waiter's dependency set is satisfied: start the wrapped supervisor.
pub(crate) fn handle_waiter_satisfied(ctx: &HandlerCtx, workflow: &WorkflowId) -> Vec<Effect> {
    let Some(waiter) = ctx.state.waiters.get(workflow) else {
        return Vec::new();
    };

    let wait_secs = ctx.now_ms.saturating_sub(waiter.started_at_ms) as f64 / 1000.0;
    for dep in &waiter.deps {
        ctx.metrics.observe(
            "dependency_wait_time_seconds",
            &[workflow.as_str(), dep.as_str()],
            wait_secs,
        );
    }

    let mut effects = vec![Effect::CancelTimer {
        id: TimerId::dep_timeout(workflow),
    }];
    start_supervisor(ctx, workflow, &mut effects);
    effects
}

/// The 24h dependency timeout fired: alert, count, and unblock — the fleet
/// continues rather than aborting.
pub(crate) fn handle_dep_timeout_timer(ctx: &HandlerCtx, workflow: &WorkflowId) -> Vec<Effect> {
    let Some(waiter) = ctx.state.waiters.get(workflow) else {
        return Vec::new();
    };
    if waiter.satisfied {
        return Vec::new();
    }

    let mut effects = Vec::new();
    for dep in &waiter.deps {
        if waiter.received.contains(dep) {
            continue;
        }
        ctx.metrics.inc_counter(
            "dependency_timeouts_total",
            &[workflow.as_str(), dep.as_str()],
            1.0,
        );
        effects.push(Effect::DispatchAlert {
            alert: rules::dependency_timeout(workflow.as_str(), dep.as_str(), ctx.now_ms),
        });
        effects.push(Effect::Emit {
            event: Event::DependencyTimedOut {
                workflow: workflow.clone(),
                dependency: dep.clone(),
            },
        });
    }
    effects
}

/// A dependency was marked timed-out; if that completes the set, the
/// waiter proceeds.
pub(crate) fn handle_dependency_timed_out(
    ctx: &HandlerCtx,
    workflow: &WorkflowId,
    dependency: &SignalName,
) -> Vec<Effect> {
    let Some(waiter) = ctx.state.waiters.get(workflow) else {
        return Vec::new();
    };
    if waiter.satisfied {
        return Vec::new();
    }
    let mut received = waiter.received.clone();
    received.insert(dependency.clone());
    let met = if waiter.required_any {
        !received.is_empty()
    } else {
        waiter.deps.iter().all(|d| received.contains(d))
    };
    if met {
        vec![Effect::Emit {
            event: Event::WaiterSatisfied {
                workflow: workflow.clone(),
            },
        }]
    } else {
        Vec::new()
    }
}

/// Start the phases whose predecessors are fully ready.
pub(crate) fn advance_phases(
    ctx: &HandlerCtx,
    plan: &FleetPlan,
    seen: &HashSet<SignalName>,
    effects: &mut Vec<Effect>,
) {
    let relay_signals: Vec<SignalName> = plan
        .relays
        .iter()
        .map(|r| SignalName::relay(&r.relay))
        .collect();
    if !relay_signals.iter().all(|s| seen.contains(s)) {
        return;
    }

    // Phase 2: parachain waiters, each depending on its relay.
    for relay in &plan.relays {
        for para in &relay.paras {
            let workflow = WorkflowId::para(&relay.relay, &para.chain);
            start_waiter(
                ctx,
                &workflow,
                vec![SignalName::relay(&relay.relay)],
                seen,
                effects,
            );
        }
    }

    let para_signals: Vec<SignalName> = plan
        .relays
        .iter()
        .flat_map(|r| r.paras.iter().map(|p| SignalName::para(&r.relay, &p.chain)))
        .collect();
    if !para_signals.iter().all(|s| seen.contains(s)) {
        return;
    }

    // Phase 3: sidecar waiters, each depending on its parachain.
    for relay in &plan.relays {
        for para in &relay.paras {
            for i in 0..para.sidecars.len() {
                let workflow = WorkflowId::sidecar(&relay.relay, &para.chain, i);
                start_waiter(
                    ctx,
                    &workflow,
                    vec![SignalName::para(&relay.relay, &para.chain)],
                    seen,
                    effects,
                );
            }
        }
    }

    // Phase 4: the proxy waits on the aggregated sidecar set.
    let sidecar_signals = plan.all_sidecar_signals();
    if !sidecar_signals.iter().all(|s| seen.contains(s)) {
        return;
    }
    let proxy_workflow = WorkflowId::service(&plan.proxy.name);
    start_waiter(ctx, &proxy_workflow, sidecar_signals, seen, effects);

    // Phase 5: application services wait on the proxy.
    if !seen.contains(&plan.proxy.ready_signal) {
        return;
    }
    for app in &plan.apps {
        let workflow = WorkflowId::service(&app.name);
        start_waiter(ctx, &workflow, vec![plan.proxy.ready_signal.clone()], seen, effects);
    }
}

/// Resume the orchestrator after a restart: catch up on phase progression
/// that crashed between signal delivery and child starts, and re-arm the
/// engine-native cron schedules.
pub(crate) fn reconcile(ctx: &HandlerCtx, effects: &mut Vec<Effect>) {
    if !ctx.state.orchestrator.running {
        return;
    }
    if let Some(plan) = &ctx.state.plan {
        for relay in &plan.relays {
            start_supervisor(ctx, &WorkflowId::relay(&relay.relay), effects);
        }
        advance_phases(ctx, plan, &ctx.state.orchestrator.seen, effects);
    }
    effects.extend(crate::runtime::cron::arm_schedules(ctx));
}

/// Start a node supervisor unless it already exists (deterministic IDs make
/// this the at-most-one guard).
fn start_supervisor(ctx: &HandlerCtx, workflow: &WorkflowId, effects: &mut Vec<Effect>) {
    if ctx.state.supervisors.contains_key(workflow) {
        return;
    }
    effects.push(Effect::Emit {
        event: Event::SupervisorStarted {
            workflow: workflow.clone(),
        },
    });
    effects.push(Effect::SetTimer {
        id: TimerId::watch(workflow),
        duration: IMMEDIATE,
    });
    ctx.metrics
        .inc_counter("workflow_executions_total", &["node", "started"], 1.0);
}

/// Start a dependent-service waiter unless it (or its supervisor) exists.
///
/// `seen` is the effective signal set including the one being processed;
/// checking the stale pre-transition set would strand a waiter whose
/// dependency arrived in the very event that started it.
fn start_waiter(
    ctx: &HandlerCtx,
    workflow: &WorkflowId,
    deps: Vec<SignalName>,
    seen: &HashSet<SignalName>,
    effects: &mut Vec<Effect>,
) {
    if ctx.state.waiters.contains_key(workflow) || ctx.state.supervisors.contains_key(workflow) {
        return;
    }

    // With every dependency already satisfied the waiter is pro forma.
    let all_seen = deps.iter().all(|d| seen.contains(d));

    effects.push(Effect::Emit {
        event: Event::WaiterStarted {
            workflow: workflow.clone(),
            deps: deps.clone(),
            required_any: false,
        },
    });
    if all_seen {
        effects.push(Effect::Emit {
            event: Event::WaiterSatisfied {
                workflow: workflow.clone(),
            },
        });
    } else {
        effects.push(Effect::SetTimer {
            id: TimerId::dep_timeout(workflow),
            duration: ctx.settings.dependency_timeout,
        });
    }
    ctx.metrics
        .inc_counter("workflow_executions_total", &["waiter", "started"], 1.0);
}

