// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch block-indexing orchestrator.
//!
//! Walks the requested range in 100k chunks, computes the missing IDs per
//! chunk, partitions them into continuous batches, and dispatches with
//! bounded concurrency. Every 500k processed blocks the run continues as
//! new to keep its history bounded.

use super::HandlerCtx;
use dix_core::{BatchRunId, Effect, Event};
use dix_storage::{partition_batches, BatchRunState};
use tracing::{debug, info, warn};

/// Range chunk examined per existing-blocks scan.
pub(crate) const CHUNK_SIZE: u64 = 100_000;

/// Processed-block threshold for continue-as-new.
pub(crate) const CONTINUE_AS_NEW_EVERY: u64 = 500_000;

pub(crate) fn handle_requested(
    ctx: &HandlerCtx,
    run: &BatchRunId,
    relay: &str,
    chain: &str,
    start_range: i64,
    end_range: i64,
) -> Vec<Effect> {
    ctx.metrics
        .inc_counter("workflow_executions_total", &["batch", "started"], 1.0);
    info!(%run, relay, chain, start_range, end_range, "batch run requested");

    let start = start_range.max(0) as u64;
    if end_range < 0 {
        return vec![Effect::FetchChainHead {
            run: run.clone(),
            relay: relay.to_string(),
            chain: chain.to_string(),
        }];
    }

    let end = end_range as u64;
    if start > end {
        return vec![finished(run)];
    }
    vec![scan_effect(run, relay, chain, start, end)]
}

pub(crate) fn handle_head_resolved(ctx: &HandlerCtx, run: &BatchRunId, head: u64) -> Vec<Effect> {
    let Some(state) = ctx.state.batch_runs.get(run) else {
        return Vec::new();
    };
    debug!(%run, head, "range end resolved");
    let start = state.next_chunk_start;
    if start > head {
        return vec![finished(run)];
    }
    vec![scan_effect(run, &state.relay, &state.chain, start, head)]
}

pub(crate) fn handle_chunk_scanned(
    ctx: &HandlerCtx,
    run: &BatchRunId,
    _chunk_start: u64,
    chunk_end: u64,
    missing: &[u64],
) -> Vec<Effect> {
    let Some(state) = ctx.state.batch_runs.get(run) else {
        return Vec::new();
    };

    // Effective queue: what apply_event will leave pending.
    let mut queue: Vec<(u64, u32)> = state.pending.iter().copied().collect();
    queue.extend(partition_batches(missing, state.batch_size));

    let capacity = (state.max_workers as usize).saturating_sub(state.in_flight.len());
    let mut effects = dispatch(run, state, &queue, capacity);

    if effects.is_empty() && state.in_flight.is_empty() && queue.is_empty() {
        // Nothing to do in this chunk; move on or finish.
        let next = chunk_end.saturating_add(1);
        match state.resolved_end() {
            Some(end) if next <= end => {
                effects.push(scan_effect(run, &state.relay, &state.chain, next, end));
            }
            _ => effects.push(finished(run)),
        }
    }
    effects
}

pub(crate) fn handle_dispatch_done(
    ctx: &HandlerCtx,
    run: &BatchRunId,
    start: u64,
    len: u32,
) -> Vec<Effect> {
    let Some(state) = ctx.state.batch_runs.get(run) else {
        return Vec::new();
    };

    let mut effects = Vec::new();

    let processed_after = state.processed + u64::from(len);
    if processed_after >= CONTINUE_AS_NEW_EVERY {
        effects.push(Effect::Emit {
            event: Event::BatchContinued {
                run: run.clone(),
                next_start: state.next_chunk_start,
            },
        });
    }

    let in_flight_after = state
        .in_flight
        .iter()
        .filter(|(s, l)| !(*s == start && *l == len))
        .count();
    let queue: Vec<(u64, u32)> = state.pending.iter().copied().collect();
    let capacity = (state.max_workers as usize).saturating_sub(in_flight_after);
    let dispatched = dispatch(run, state, &queue, capacity);
    let dispatched_any = !dispatched.is_empty();
    effects.extend(dispatched);

    if !dispatched_any && in_flight_after == 0 && queue.is_empty() {
        match state.resolved_end() {
            Some(end) if state.next_chunk_start <= end => {
                effects.push(scan_effect(
                    run,
                    &state.relay,
                    &state.chain,
                    state.next_chunk_start,
                    end,
                ));
            }
            _ => effects.push(finished(run)),
        }
    }
    effects
}

pub(crate) fn handle_finished(ctx: &HandlerCtx, run: &BatchRunId) -> Vec<Effect> {
    ctx.metrics
        .inc_counter("workflow_executions_total", &["batch", "completed"], 1.0);
    if let Some(state) = ctx.state.batch_runs.get(run) {
        let duration_secs = ctx.now_ms.saturating_sub(state.started_at_ms) as f64 / 1000.0;
        ctx.metrics
            .observe("workflow_duration_seconds", &["batch"], duration_secs);
        info!(%run, relay = %state.relay, chain = %state.chain, "batch run finished");
    } else {
        warn!(%run, "finish for unknown batch run");
    }
    Vec::new()
}

/// Claim up to `capacity` batches from the queue head, left to right.
///
/// Dispatch is two-step: the claim is the durable `BatchDispatched` event;
/// its handler issues the processing activity once the claim has applied.
/// Batches already in flight are skipped, so a duplicate claim (activity
/// completions racing the queue) stays harmless.
fn dispatch(
    run: &BatchRunId,
    state: &BatchRunState,
    queue: &[(u64, u32)],
    capacity: usize,
) -> Vec<Effect> {
    queue
        .iter()
        .filter(|b| !state.in_flight.contains(b))
        .take(capacity)
        .map(|(start, len)| Effect::Emit {
            event: Event::BatchDispatched {
                run: run.clone(),
                start: *start,
                len: *len,
            },
        })
        .collect()
}

/// A claim landed: run the matching activity. Batches longer than one block
/// take the batch path, single blocks the single path.
pub(crate) fn handle_dispatched(
    ctx: &HandlerCtx,
    run: &BatchRunId,
    start: u64,
    len: u32,
) -> Vec<Effect> {
    let Some(state) = ctx.state.batch_runs.get(run) else {
        return Vec::new();
    };
    // Duplicate claim: the first one already started the activity.
    if state.in_flight.contains(&(start, len)) {
        return Vec::new();
    }
    if len > 1 {
        vec![Effect::ProcessBlockBatch {
            run: run.clone(),
            relay: state.relay.clone(),
            chain: state.chain.clone(),
            start,
            len,
        }]
    } else {
        vec![Effect::ProcessSingleBlock {
            run: run.clone(),
            relay: state.relay.clone(),
            chain: state.chain.clone(),
            id: start,
        }]
    }
}

/// Resume unfinished runs after a restart: re-dispatch what was in flight
/// (activities are at-least-once), or restart the current scan.
pub(crate) fn reconcile(ctx: &HandlerCtx, effects: &mut Vec<Effect>) {
    for (run, state) in &ctx.state.batch_runs {
        if state.finished {
            continue;
        }
        if state.end_range < 0 {
            effects.push(Effect::FetchChainHead {
                run: run.clone(),
                relay: state.relay.clone(),
                chain: state.chain.clone(),
            });
            continue;
        }

        for (start, len) in &state.in_flight {
            if *len > 1 {
                effects.push(Effect::ProcessBlockBatch {
                    run: run.clone(),
                    relay: state.relay.clone(),
                    chain: state.chain.clone(),
                    start: *start,
                    len: *len,
                });
            } else {
                effects.push(Effect::ProcessSingleBlock {
                    run: run.clone(),
                    relay: state.relay.clone(),
                    chain: state.chain.clone(),
                    id: *start,
                });
            }
        }

        let queue: Vec<(u64, u32)> = state.pending.iter().copied().collect();
        let capacity = (state.max_workers as usize).saturating_sub(state.in_flight.len());
        effects.extend(dispatch(run, state, &queue, capacity));

        if state.in_flight.is_empty() && queue.is_empty() {
            match state.resolved_end() {
                Some(end) if state.next_chunk_start <= end => {
                    effects.push(scan_effect(
                        run,
                        &state.relay,
                        &state.chain,
                        state.next_chunk_start,
                        end,
                    ));
                }
                _ => effects.push(finished(run)),
            }
        }
    }
}

fn scan_effect(run: &BatchRunId, relay: &str, chain: &str, start: u64, end: u64) -> Effect {
    Effect::ScanExistingBlocks {
        run: run.clone(),
        relay: relay.to_string(),
        chain: chain.to_string(),
        chunk_start: start,
        chunk_end: end.min(start + CHUNK_SIZE - 1),
    }
}

fn finished(run: &BatchRunId) -> Effect {
    Effect::Emit {
        event: Event::BatchFinished { run: run.clone() },
    }
}
