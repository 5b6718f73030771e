// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identifier type for tracking scheduled timers.
//!
//! Timers are the durable-sleep primitive of the engine: a workflow that
//! needs to wait registers a timer and resumes when the matching
//! `Event::TimerFired` arrives.

use crate::signal::WorkflowId;

crate::define_id! {
    /// Unique identifier for a timer instance.
    pub struct TimerId;
}

impl TimerId {
    /// Watch-interval tick for a node supervisor.
    pub fn watch(workflow: &WorkflowId) -> Self {
        TimerKind::Watch(workflow.clone()).to_timer_id()
    }

    /// Backoff sleep before a restart attempt.
    pub fn backoff(workflow: &WorkflowId) -> Self {
        TimerKind::Backoff(workflow.clone()).to_timer_id()
    }

    /// Dependency-wait timeout for a dependent-service waiter.
    pub fn dep_timeout(workflow: &WorkflowId) -> Self {
        TimerKind::DepTimeout(workflow.clone()).to_timer_id()
    }

    pub fn cron_hourly() -> Self {
        TimerKind::CronHourly.to_timer_id()
    }

    pub fn cron_daily() -> Self {
        TimerKind::CronDaily.to_timer_id()
    }

    pub fn history_purge() -> Self {
        TimerKind::HistoryPurge.to_timer_id()
    }

    /// Parse this timer ID into a typed `TimerKind`.
    pub fn kind(&self) -> Option<TimerKind> {
        TimerKind::parse(self.as_str())
    }
}

/// Parsed representation of a timer ID for type-safe routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    Watch(WorkflowId),
    Backoff(WorkflowId),
    DepTimeout(WorkflowId),
    CronHourly,
    CronDaily,
    HistoryPurge,
}

impl TimerKind {
    /// Parse a timer ID string into a typed `TimerKind`.
    ///
    /// Returns `None` for unrecognized timer ID formats.
    pub fn parse(id: &str) -> Option<TimerKind> {
        if let Some(rest) = id.strip_prefix("watch:") {
            return Some(TimerKind::Watch(WorkflowId::new(rest)));
        }
        if let Some(rest) = id.strip_prefix("backoff:") {
            return Some(TimerKind::Backoff(WorkflowId::new(rest)));
        }
        if let Some(rest) = id.strip_prefix("dep-timeout:") {
            return Some(TimerKind::DepTimeout(WorkflowId::new(rest)));
        }
        match id {
            "cron:hourly" => Some(TimerKind::CronHourly),
            "cron:daily" => Some(TimerKind::CronDaily),
            "history:purge" => Some(TimerKind::HistoryPurge),
            _ => None,
        }
    }

    /// Format this `TimerKind` back into a canonical `TimerId`.
    pub fn to_timer_id(&self) -> TimerId {
        match self {
            TimerKind::Watch(wf) => TimerId::new(format!("watch:{wf}")),
            TimerKind::Backoff(wf) => TimerId::new(format!("backoff:{wf}")),
            TimerKind::DepTimeout(wf) => TimerId::new(format!("dep-timeout:{wf}")),
            TimerKind::CronHourly => TimerId::new("cron:hourly"),
            TimerKind::CronDaily => TimerId::new("cron:daily"),
            TimerKind::HistoryPurge => TimerId::new("history:purge"),
        }
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
