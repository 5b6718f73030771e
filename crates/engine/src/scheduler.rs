// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer and scheduling management.
//!
//! Timers are in-memory; after a restart they are re-armed from the
//! materialized state by startup reconciliation, which is what makes the
//! engine's `Sleep` durable.

use dix_core::{Event, TimerId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Timer {
    fires_at: Instant,
}

/// Manages timers for the runtime
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: HashMap<String, Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a timer.
    pub fn set_timer(&mut self, id: &TimerId, duration: Duration, now: Instant) {
        self.timers.insert(
            id.as_str().to_string(),
            Timer {
                fires_at: now + duration,
            },
        );
    }

    pub fn cancel_timer(&mut self, id: &TimerId) {
        self.timers.remove(id.as_str());
    }

    /// Remove and return all timers that have fired.
    pub fn fired_timers(&mut self, now: Instant) -> Vec<Event> {
        let mut fired: Vec<String> = self
            .timers
            .iter()
            .filter(|(_, t)| t.fires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        // Stable firing order for deterministic tests.
        fired.sort();

        let mut events = Vec::with_capacity(fired.len());
        for id in fired {
            self.timers.remove(&id);
            events.push(Event::TimerFired {
                id: TimerId::new(id),
            });
        }
        events
    }

    /// The next timer deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.fires_at).min()
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    #[cfg(test)]
    pub fn timer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.timers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
