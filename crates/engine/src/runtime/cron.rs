// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic-query orchestrator and the history retention schedule.
//!
//! Two engine-native cron schedules: hourly recomputes the primary
//! statistic for the current month across all chains; daily recomputes all
//! registered statistics for every (chain, year, month) tuple from the
//! first year through the previous month, skipping tuples whose stored
//! timestamp is non-zero (the skip happens activity-side).

use super::HandlerCtx;
use chrono::{DateTime, Datelike, Utc};
use dix_core::{Effect, TimerId};
use std::time::Duration;
use tracing::{debug, info, warn};

const HOUR_MS: u64 = 3_600_000;
const DAY_MS: u64 = 86_400_000;

/// Arm the cron and purge timers at their next boundaries.
pub(crate) fn arm_schedules(ctx: &HandlerCtx) -> Vec<Effect> {
    vec![
        Effect::SetTimer {
            id: TimerId::cron_hourly(),
            duration: until_next_boundary(ctx.now_ms, HOUR_MS),
        },
        Effect::SetTimer {
            id: TimerId::cron_daily(),
            duration: until_next_boundary(ctx.now_ms, DAY_MS),
        },
        Effect::SetTimer {
            id: TimerId::history_purge(),
            duration: until_next_boundary(ctx.now_ms, DAY_MS),
        },
    ]
}

pub(crate) fn handle_hourly(ctx: &HandlerCtx) -> Vec<Effect> {
    let mut effects = vec![Effect::SetTimer {
        id: TimerId::cron_hourly(),
        duration: until_next_boundary(ctx.now_ms, HOUR_MS),
    }];

    let Some(plan) = &ctx.state.plan else {
        return effects;
    };
    let Some(stat) = plan.stats.names.first() else {
        debug!("no registered statistics");
        return effects;
    };
    let Some((year, month)) = year_month(ctx.now_ms) else {
        return effects;
    };

    info!(stat, year, month, chains = plan.stats.chains.len(), "hourly stats pass");
    ctx.metrics
        .inc_counter("workflow_executions_total", &["stats_hourly", "started"], 1.0);
    for chain in &plan.stats.chains {
        effects.push(Effect::RunStat {
            chain: chain.clone(),
            stat: stat.clone(),
            year,
            month,
        });
    }
    effects
}

pub(crate) fn handle_daily(ctx: &HandlerCtx) -> Vec<Effect> {
    let mut effects = vec![Effect::SetTimer {
        id: TimerId::cron_daily(),
        duration: until_next_boundary(ctx.now_ms, DAY_MS),
    }];

    let Some(plan) = &ctx.state.plan else {
        return effects;
    };
    let Some((now_year, now_month)) = year_month(ctx.now_ms) else {
        return effects;
    };
    let (prev_year, prev_month) = previous_month(now_year, now_month);

    info!(
        first_year = plan.stats.first_year,
        prev_year, prev_month, "daily stats sweep"
    );
    ctx.metrics
        .inc_counter("workflow_executions_total", &["stats_daily", "started"], 1.0);

    for chain in &plan.stats.chains {
        for stat in &plan.stats.names {
            for year in plan.stats.first_year..=prev_year {
                for month in 1..=12u32 {
                    if year == prev_year && month > prev_month {
                        break;
                    }
                    effects.push(Effect::RunStat {
                        chain: chain.clone(),
                        stat: stat.clone(),
                        year,
                        month,
                    });
                }
            }
        }
    }
    effects
}

pub(crate) fn handle_history_purge(ctx: &HandlerCtx) -> Vec<Effect> {
    let retention_ms = u64::from(ctx.settings.history_retention_days) * DAY_MS;
    vec![
        Effect::PurgeHistory {
            cutoff_ms: ctx.now_ms.saturating_sub(retention_ms),
        },
        Effect::SetTimer {
            id: TimerId::history_purge(),
            duration: until_next_boundary(ctx.now_ms, DAY_MS),
        },
    ]
}

pub(crate) fn handle_stat_computed(
    ctx: &HandlerCtx,
    chain: &str,
    stat: &str,
    success: bool,
    skipped: bool,
) -> Vec<Effect> {
    let status = if skipped {
        "skipped"
    } else if success {
        "completed"
    } else {
        "failed"
    };
    ctx.metrics
        .inc_counter("workflow_executions_total", &["stat", status], 1.0);
    if !success {
        warn!(chain, stat, "stat computation failed");
    }
    Vec::new()
}

/// Milliseconds until the next multiple of `period_ms`, at least one second
/// to avoid a hot loop on the boundary itself.
fn until_next_boundary(now_ms: u64, period_ms: u64) -> Duration {
    let rem = now_ms % period_ms;
    let wait = period_ms - rem;
    Duration::from_millis(wait.max(1000))
}

fn year_month(now_ms: u64) -> Option<(i32, u32)> {
    let dt: DateTime<Utc> = DateTime::from_timestamp_millis(now_ms as i64)?;
    Some((dt.year(), dt.month()))
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
