// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node supervisor workflow.
//!
//! Loop per service: check the unit state, classify, maybe restart with
//! linear backoff, gate readiness on the sync probe, sleep the watch
//! interval. The ready signal is emitted at most once per run.

use super::HandlerCtx;
use crate::alerts::rules;
use dix_core::{
    Effect, Event, HealthEvent, ProcessState, ResourceSample, SupervisorPhase, SupervisorState,
    TimerId, WorkflowId,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Watch tick: issue the state-check activity.
pub(crate) fn handle_watch_timer(ctx: &HandlerCtx, workflow: &WorkflowId) -> Vec<Effect> {
    let Some(sup) = ctx.state.supervisor(workflow) else {
        debug!(%workflow, "watch timer for unknown supervisor");
        return Vec::new();
    };
    vec![Effect::CheckServiceState {
        workflow: workflow.clone(),
        unit: sup.descriptor.unit.clone(),
    }]
}

/// Backoff elapsed: issue the restart activity.
pub(crate) fn handle_backoff_timer(ctx: &HandlerCtx, workflow: &WorkflowId) -> Vec<Effect> {
    let Some(sup) = ctx.state.supervisor(workflow) else {
        return Vec::new();
    };
    vec![Effect::RestartService {
        workflow: workflow.clone(),
        unit: sup.descriptor.unit.clone(),
    }]
}

pub(crate) fn handle_state_checked(
    ctx: &HandlerCtx,
    workflow: &WorkflowId,
    state: ProcessState,
    error: Option<&str>,
) -> Vec<Effect> {
    let Some(sup) = ctx.state.supervisor(workflow) else {
        return Vec::new();
    };
    let healthy = error.is_none() && state.is_active();
    let des = &sup.descriptor;
    let chain = des.chain.as_deref().unwrap_or("");

    ctx.metrics.set_gauge(
        "service_health",
        &[&des.name, &des.service_type.to_string(), chain],
        if healthy { 1.0 } else { 0.0 },
    );

    let mut effects = Vec::new();
    let mut health_event = HealthEvent::new(
        ctx.now_ms,
        &des.name,
        des.service_type.to_string(),
        healthy,
    );
    health_event.chain = des.chain.clone();
    health_event.active_state = Some(state.to_string());
    health_event.restart_count = sup.restart_count;
    health_event.error = error.map(str::to_string);

    if healthy {
        handle_healthy(ctx, sup, workflow, &mut effects);
    } else {
        handle_unhealthy(ctx, sup, workflow, state, error, &mut effects);
    }

    effects.push(Effect::RecordHealth {
        event: health_event,
    });
    if des.parent_workflow.is_some() {
        effects.push(Effect::Emit {
            event: Event::HealthUpdate {
                workflow: workflow.clone(),
                healthy,
            },
        });
    }
    effects
}

fn handle_healthy(
    ctx: &HandlerCtx,
    sup: &SupervisorState,
    workflow: &WorkflowId,
    effects: &mut Vec<Effect>,
) {
    let des = &sup.descriptor;

    // Recovery transition: account downtime and resolve availability alerts.
    let was_unhealthy = matches!(
        sup.phase,
        SupervisorPhase::Degraded | SupervisorPhase::Restarting | SupervisorPhase::Exhausted
    );
    if was_unhealthy {
        if sup.unhealthy_since_ms > 0 {
            let downtime_secs =
                ctx.now_ms.saturating_sub(sup.unhealthy_since_ms) as f64 / 1000.0;
            ctx.metrics.inc_counter(
                "service_downtime_seconds_total",
                &[&des.name, &des.service_type.to_string()],
                downtime_secs,
            );
        }
        effects.push(Effect::ResolveAlerts {
            service: des.name.clone(),
        });
    }

    if !sup.ready_emitted {
        if des.check_sync {
            if let Some(endpoint) = des.sync_endpoint() {
                effects.push(Effect::CheckSync {
                    workflow: workflow.clone(),
                    endpoint,
                });
            } else {
                warn!(%workflow, "check_sync set but no rpc endpoint, emitting ready");
                effects.push(ready_effect(sup, workflow));
            }
        } else {
            effects.push(ready_effect(sup, workflow));
        }
    }

    if let Some(spec) = &des.http_probe {
        effects.push(Effect::ProbeHttp {
            service: des.name.clone(),
            spec: spec.clone(),
        });
    }

    if ctx.settings.resource_monitoring_enabled {
        effects.push(Effect::SampleResources {
            workflow: workflow.clone(),
            unit: des.unit.clone(),
        });
    }

    effects.push(Effect::SetTimer {
        id: TimerId::watch(workflow),
        duration: des.watch_interval,
    });
}

fn handle_unhealthy(
    ctx: &HandlerCtx,
    sup: &SupervisorState,
    workflow: &WorkflowId,
    state: ProcessState,
    error: Option<&str>,
    effects: &mut Vec<Effect>,
) {
    let des = &sup.descriptor;

    if let Some(alert) = rules::evaluate_service_down(&des.name, state, error, ctx.now_ms) {
        effects.push(Effect::DispatchAlert { alert });
    }

    if sup.phase == SupervisorPhase::Exhausted {
        // Budget spent: keep probing and reporting, never restart.
        effects.push(Effect::SetTimer {
            id: TimerId::watch(workflow),
            duration: des.watch_interval,
        });
        return;
    }

    if sup.can_restart() {
        if let Some(alert) =
            rules::evaluate_restart_loop(ctx.settings, &des.name, sup.restart_count + 1, ctx.now_ms)
        {
            effects.push(Effect::DispatchAlert { alert });
        }
        // Attempt n sleeps n * backoff_base; the first attempt goes now.
        let backoff = des.restart_backoff_base * sup.restart_count;
        if backoff.is_zero() {
            effects.push(Effect::RestartService {
                workflow: workflow.clone(),
                unit: des.unit.clone(),
            });
        } else {
            effects.push(Effect::SetTimer {
                id: TimerId::backoff(workflow),
                duration: backoff,
            });
        }
        // The watch timer resumes once the restart finishes.
        return;
    }

    // Budget newly spent.
    effects.push(Effect::Emit {
        event: Event::SupervisorExhausted {
            workflow: workflow.clone(),
        },
    });
    effects.push(Effect::SetTimer {
        id: TimerId::watch(workflow),
        duration: des.watch_interval,
    });
}

pub(crate) fn handle_sync_checked(
    ctx: &HandlerCtx,
    workflow: &WorkflowId,
    synced: bool,
    peers: u32,
    error: Option<&str>,
) -> Vec<Effect> {
    let Some(sup) = ctx.state.supervisor(workflow) else {
        return Vec::new();
    };
    let des = &sup.descriptor;
    let chain = des.chain.as_deref().unwrap_or(des.relay.as_deref().unwrap_or(""));

    let mut effects = Vec::new();
    if error.is_none() {
        ctx.metrics.set_gauge(
            "node_sync_status",
            &[&des.name, chain],
            if synced { 1.0 } else { 0.0 },
        );
        ctx.metrics
            .set_gauge("node_peer_count", &[&des.name, chain], f64::from(peers));

        if let Some(alert) = rules::evaluate_low_peers(ctx.settings, &des.name, peers, ctx.now_ms) {
            effects.push(Effect::DispatchAlert { alert });
        }
    }

    if synced && !sup.ready_emitted {
        effects.push(ready_effect(sup, workflow));
    }
    effects
}

pub(crate) fn handle_restart_finished(
    ctx: &HandlerCtx,
    workflow: &WorkflowId,
    success: bool,
) -> Vec<Effect> {
    let Some(sup) = ctx.state.supervisor(workflow) else {
        return Vec::new();
    };
    let des = &sup.descriptor;

    ctx.metrics.inc_counter(
        "service_restarts_total",
        &[&des.name, &des.service_type.to_string()],
        1.0,
    );

    vec![
        Effect::RecordRestart {
            service: des.name.clone(),
            reason: "unit unhealthy".to_string(),
            success,
        },
        Effect::SetTimer {
            id: TimerId::watch(workflow),
            duration: des.watch_interval,
        },
    ]
}

pub(crate) fn handle_exhausted(ctx: &HandlerCtx, workflow: &WorkflowId) -> Vec<Effect> {
    let Some(sup) = ctx.state.supervisor(workflow) else {
        return Vec::new();
    };
    ctx.metrics
        .inc_counter("workflow_executions_total", &["node", "exhausted"], 1.0);
    warn!(%workflow, restarts = sup.restart_count, "restart budget exhausted");

    vec![Effect::DispatchAlert {
        alert: rules::evaluate_restart_loop(
            ctx.settings,
            &sup.descriptor.name,
            sup.restart_count,
            ctx.now_ms,
        )
        .unwrap_or_else(|| {
            dix_core::Alert::new(
                dix_core::AlertType::RestartLoop,
                dix_core::Severity::Critical,
                &sup.descriptor.name,
                "restart budget exhausted",
                ctx.now_ms,
            )
        }),
    }]
}

pub(crate) fn handle_resources_sampled(
    ctx: &HandlerCtx,
    workflow: &WorkflowId,
    sample: &ResourceSample,
) -> Vec<Effect> {
    let Some(sup) = ctx.state.supervisor(workflow) else {
        return Vec::new();
    };
    let des = &sup.descriptor;
    let ty = des.service_type.to_string();

    ctx.metrics
        .set_gauge("service_cpu_percent", &[&des.name, &ty], sample.cpu_percent);
    ctx.metrics.set_gauge(
        "service_memory_bytes",
        &[&des.name, &ty],
        sample.memory_bytes as f64,
    );
    ctx.metrics.set_gauge(
        "service_disk_io_bytes_per_second",
        &[&des.name, &ty, "read"],
        sample.disk_read_bytes_per_sec,
    );
    ctx.metrics.set_gauge(
        "service_disk_io_bytes_per_second",
        &[&des.name, &ty, "write"],
        sample.disk_write_bytes_per_sec,
    );

    let mut effects: Vec<Effect> = rules::evaluate_resources(ctx.settings, &des.name, sample, ctx.now_ms)
        .into_iter()
        .map(|alert| Effect::DispatchAlert { alert })
        .collect();

    let mut health_event = HealthEvent::new(ctx.now_ms, &des.name, ty, true);
    health_event.chain = des.chain.clone();
    health_event.resources = Some(*sample);
    health_event.restart_count = sup.restart_count;
    effects.push(Effect::RecordHealth {
        event: health_event,
    });
    effects
}

pub(crate) fn handle_http_probed(
    ctx: &HandlerCtx,
    service: &str,
    healthy: bool,
    error: Option<&str>,
) -> Vec<Effect> {
    match rules::evaluate_http_failure(service, healthy, error, ctx.now_ms) {
        Some(alert) => vec![Effect::DispatchAlert { alert }],
        None => Vec::new(),
    }
}

/// Emit the ready signal (the latch is enforced by the caller checking
/// `ready_emitted` on the pre-transition state).
fn ready_effect(sup: &SupervisorState, workflow: &WorkflowId) -> Effect {
    Effect::Emit {
        event: Event::Ready {
            signal: sup.descriptor.ready_signal.clone(),
            from: workflow.clone(),
        },
    }
}

/// Zero-duration timer for an immediate first check.
pub(crate) const IMMEDIATE: Duration = Duration::ZERO;
