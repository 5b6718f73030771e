// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable local store of health events, downtime incidents, restarts and
//! alert history.
//!
//! Four JSONL tables under one directory, append-only between purges:
//!
//! - `health_events.jsonl`
//! - `downtime.jsonl`
//! - `restarts.jsonl`
//! - `alerts.jsonl`
//!
//! The daily retention purge rewrites each table dropping rows older than
//! the configured retention, reclaiming space.

use dix_core::{AlertRecord, DowntimeIncident, HealthEvent, RestartEvent};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const HEALTH_TABLE: &str = "health_events.jsonl";
const DOWNTIME_TABLE: &str = "downtime.jsonl";
const RESTART_TABLE: &str = "restarts.jsonl";
const ALERT_TABLE: &str = "alerts.jsonl";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Aggregate downtime numbers for one service.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DowntimeStats {
    pub count: u64,
    pub total_secs: u64,
    pub mean_secs: f64,
    pub max_secs: u64,
}

struct Inner {
    /// Open incidents keyed by service, resolved on the next healthy record.
    open_incidents: HashMap<String, DowntimeIncident>,
    /// Last observed health per service, for transition detection.
    last_healthy: HashMap<String, bool>,
}

/// Local durable history store.
pub struct HistoryStore {
    dir: PathBuf,
    inner: Mutex<Inner>,
}

impl HistoryStore {
    /// Open (or create) the store under the given directory.
    pub fn open(dir: &Path) -> Result<Self, HistoryError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_owned(),
            inner: Mutex::new(Inner {
                open_incidents: HashMap::new(),
                last_healthy: HashMap::new(),
            }),
        })
    }

    /// Append a probe outcome; opens or resolves downtime incidents on
    /// health transitions.
    pub fn record_health(&self, event: &HealthEvent) -> Result<(), HistoryError> {
        self.append(HEALTH_TABLE, event)?;

        let mut inner = self.inner.lock();
        let was_healthy = inner
            .last_healthy
            .insert(event.service.clone(), event.healthy)
            .unwrap_or(true);

        if was_healthy && !event.healthy {
            inner.open_incidents.insert(
                event.service.clone(),
                DowntimeIncident {
                    service: event.service.clone(),
                    start_ms: event.timestamp_ms,
                    end_ms: None,
                    duration_secs: 0,
                    reason: event
                        .error
                        .clone()
                        .unwrap_or_else(|| "unhealthy".to_string()),
                    resolved: false,
                },
            );
        } else if !was_healthy && event.healthy {
            if let Some(mut incident) = inner.open_incidents.remove(&event.service) {
                incident.end_ms = Some(event.timestamp_ms);
                incident.duration_secs =
                    event.timestamp_ms.saturating_sub(incident.start_ms) / 1000;
                incident.resolved = true;
                drop(inner);
                self.append(DOWNTIME_TABLE, &incident)?;
                return Ok(());
            }
        }
        Ok(())
    }

    pub fn record_restart(&self, event: &RestartEvent) -> Result<(), HistoryError> {
        self.append(RESTART_TABLE, event)
    }

    pub fn record_alert(&self, record: &AlertRecord) -> Result<(), HistoryError> {
        self.append(ALERT_TABLE, record)
    }

    /// Incidents currently open (service is down right now).
    pub fn open_incidents(&self) -> Vec<DowntimeIncident> {
        self.inner.lock().open_incidents.values().cloned().collect()
    }

    /// Health events for a service since the given time, newest last,
    /// capped at `limit`.
    pub fn service_history(
        &self,
        service: &str,
        since_ms: u64,
        limit: usize,
    ) -> Result<Vec<HealthEvent>, HistoryError> {
        let mut rows: Vec<HealthEvent> = self
            .read_table::<HealthEvent>(HEALTH_TABLE)?
            .into_iter()
            .filter(|e| e.service == service && e.timestamp_ms >= since_ms)
            .collect();
        if rows.len() > limit {
            rows.drain(..rows.len() - limit);
        }
        Ok(rows)
    }

    /// Uptime percentage over a window: `healthy / total * 100`.
    ///
    /// An empty window reports 100%.
    pub fn uptime_percent(
        &self,
        service: &str,
        window_start_ms: u64,
        window_end_ms: u64,
    ) -> Result<f64, HistoryError> {
        let mut total = 0u64;
        let mut healthy = 0u64;
        for event in self.read_table::<HealthEvent>(HEALTH_TABLE)? {
            if event.service == service
                && event.timestamp_ms >= window_start_ms
                && event.timestamp_ms <= window_end_ms
            {
                total += 1;
                if event.healthy {
                    healthy += 1;
                }
            }
        }
        if total == 0 {
            return Ok(100.0);
        }
        Ok(healthy as f64 / total as f64 * 100.0)
    }

    /// Count / sum / mean / max of resolved downtime for a service.
    pub fn downtime_stats(
        &self,
        service: &str,
        since_ms: u64,
    ) -> Result<DowntimeStats, HistoryError> {
        let mut stats = DowntimeStats::default();
        for incident in self.read_table::<DowntimeIncident>(DOWNTIME_TABLE)? {
            if incident.service == service && incident.start_ms >= since_ms && incident.resolved {
                stats.count += 1;
                stats.total_secs += incident.duration_secs;
                stats.max_secs = stats.max_secs.max(incident.duration_secs);
            }
        }
        if stats.count > 0 {
            stats.mean_secs = stats.total_secs as f64 / stats.count as f64;
        }
        Ok(stats)
    }

    /// Drop rows older than the cutoff from every table and reclaim space.
    pub fn purge_older_than(&self, cutoff_ms: u64) -> Result<u64, HistoryError> {
        let mut dropped = 0;
        dropped += self.purge_table::<HealthEvent>(HEALTH_TABLE, |e| e.timestamp_ms >= cutoff_ms)?;
        dropped +=
            self.purge_table::<DowntimeIncident>(DOWNTIME_TABLE, |i| i.start_ms >= cutoff_ms)?;
        dropped += self.purge_table::<RestartEvent>(RESTART_TABLE, |e| e.timestamp_ms >= cutoff_ms)?;
        dropped += self.purge_table::<AlertRecord>(ALERT_TABLE, |a| a.timestamp_ms >= cutoff_ms)?;
        debug!(dropped, "history retention purge complete");
        Ok(dropped)
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(table)
    }

    fn append<T: Serialize>(&self, table: &str, row: &T) -> Result<(), HistoryError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.table_path(table))?;
        let mut line = serde_json::to_vec(row)?;
        line.push(b'\n');
        file.write_all(&line)?;
        Ok(())
    }

    fn read_table<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, HistoryError> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut rows = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str(trimmed) {
                Ok(row) => rows.push(row),
                Err(e) => warn!(table, error = %e, "skipping corrupt history row"),
            }
        }
        Ok(rows)
    }

    /// Rewrite a table keeping rows matching `keep`. Returns dropped count.
    fn purge_table<T: DeserializeOwned + Serialize>(
        &self,
        table: &str,
        keep: impl Fn(&T) -> bool,
    ) -> Result<u64, HistoryError> {
        let rows: Vec<T> = self.read_table(table)?;
        if rows.is_empty() {
            return Ok(0);
        }
        let before = rows.len();
        let kept: Vec<T> = rows.into_iter().filter(|r| keep(r)).collect();
        let dropped = (before - kept.len()) as u64;
        if dropped == 0 {
            return Ok(0);
        }

        let path = self.table_path(table);
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            for row in &kept {
                let mut line = serde_json::to_vec(row)?;
                line.push(b'\n');
                file.write_all(&line)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(dropped)
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
