// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor: performs activities against the adapters.
//!
//! Activities run with a per-attempt timeout and bounded exponential retry;
//! upstream probes and chain calls are guarded by per-target circuit
//! breakers. Persistent failures never raise into the workflow layer —
//! completions re-enter the engine as events carrying the failure.

use crate::alerts::AlertManager;
use crate::breaker::BreakerManager;
use crate::metrics::Metrics;
use crate::retry::RetryPolicy;
use crate::scheduler::Scheduler;
use dix_adapters::{
    ChainClient, HttpProbe, ProcessManager, ResourceProbe, StatsRunner, SyncProbe,
};
use dix_core::{Clock, Effect, Event, SettingsHandle};
use dix_storage::HistoryStore;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Adapter and service dependencies injected into activity implementations.
pub struct ExecutorDeps {
    pub manager: Arc<dyn ProcessManager>,
    pub sync_probe: Arc<dyn SyncProbe>,
    pub http_probe: Arc<dyn HttpProbe>,
    pub resource_probe: Arc<dyn ResourceProbe>,
    pub chain: Arc<dyn ChainClient>,
    pub stats: Arc<dyn StatsRunner>,
    pub alerts: Arc<AlertManager>,
    pub history: Option<Arc<HistoryStore>>,
    pub breakers: Arc<BreakerManager>,
    pub metrics: Arc<Metrics>,
    pub settings: SettingsHandle,
}

pub struct Executor<C: Clock> {
    deps: ExecutorDeps,
    scheduler: Arc<Mutex<Scheduler>>,
    retry: RetryPolicy,
    /// Watch mode: state-changing actions are logged and skipped.
    dry_run: bool,
    clock: C,
}

impl<C: Clock> Executor<C> {
    pub fn new(
        deps: ExecutorDeps,
        scheduler: Arc<Mutex<Scheduler>>,
        retry: RetryPolicy,
        dry_run: bool,
        clock: C,
    ) -> Self {
        Self {
            deps,
            scheduler,
            retry,
            dry_run,
            clock,
        }
    }

    pub fn scheduler(&self) -> Arc<Mutex<Scheduler>> {
        Arc::clone(&self.scheduler)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Execute one effect, returning the completion events to feed back.
    pub async fn execute(&self, effect: Effect) -> Vec<Event> {
        let name = effect.name();
        debug!(effect = name, "executing");

        match effect {
            Effect::Emit { event } => vec![event],

            Effect::SetTimer { id, duration } => {
                self.scheduler.lock().set_timer(&id, duration, self.clock.now());
                Vec::new()
            }

            Effect::CancelTimer { id } => {
                self.scheduler.lock().cancel_timer(&id);
                Vec::new()
            }

            Effect::CheckServiceState { workflow, unit } => {
                let manager = Arc::clone(&self.deps.manager);
                let result = self
                    .activity("check_service_state", None, || {
                        let manager = Arc::clone(&manager);
                        let unit = unit.clone();
                        async move {
                            manager
                                .status(&unit)
                                .await
                                .map_err(|e| e.to_string())
                        }
                    })
                    .await;
                let event = match result {
                    Ok(status) => Event::StateChecked {
                        workflow,
                        state: status.state,
                        error: None,
                    },
                    Err(e) => Event::StateChecked {
                        workflow,
                        state: dix_core::ProcessState::Unknown,
                        error: Some(e),
                    },
                };
                vec![event]
            }

            Effect::RestartService { workflow, unit } => {
                if self.dry_run {
                    info!(unit, "watch mode: skipping restart");
                    return vec![Event::RestartFinished {
                        workflow,
                        success: true,
                    }];
                }
                let manager = Arc::clone(&self.deps.manager);
                let result = self
                    .activity("restart_service", None, || {
                        let manager = Arc::clone(&manager);
                        let unit = unit.clone();
                        async move { manager.restart(&unit).await.map_err(|e| e.to_string()) }
                    })
                    .await;
                vec![Event::RestartFinished {
                    workflow,
                    success: result.is_ok(),
                }]
            }

            Effect::CheckSync { workflow, endpoint } => {
                let probe = Arc::clone(&self.deps.sync_probe);
                let breaker = format!("sync:{workflow}");
                let result = self
                    .activity("check_sync", Some(&breaker), || {
                        let probe = Arc::clone(&probe);
                        let endpoint = endpoint.clone();
                        async move { probe.check(&endpoint).await.map_err(|e| e.to_string()) }
                    })
                    .await;
                let event = match result {
                    Ok(status) => Event::SyncChecked {
                        workflow,
                        synced: status.synced,
                        peers: status.peers,
                        error: None,
                    },
                    Err(e) => Event::SyncChecked {
                        workflow,
                        synced: false,
                        peers: 0,
                        error: Some(e),
                    },
                };
                vec![event]
            }

            Effect::ProbeHttp { service, spec } => {
                let breaker_name = format!("http:{service}");
                let now = self.clock.now();
                if self.breakers_enabled() {
                    let breaker = self.deps.breakers.get(&breaker_name, now);
                    if breaker.try_acquire(now).is_err() {
                        return vec![Event::HttpProbed {
                            service,
                            healthy: false,
                            status: 0,
                            elapsed_ms: 0,
                            error: Some("circuit open".to_string()),
                        }];
                    }
                }

                let start = self.clock.now();
                let result = self.deps.http_probe.probe(&spec).await;
                self.record_activity("probe_http", start, result.healthy);

                if self.breakers_enabled() {
                    let breaker = self.deps.breakers.get(&breaker_name, self.clock.now());
                    if result.healthy {
                        breaker.record_success(self.clock.now());
                    } else {
                        breaker.record_failure(self.clock.now());
                    }
                }

                vec![Event::HttpProbed {
                    service,
                    healthy: result.healthy,
                    status: result.status,
                    elapsed_ms: result.elapsed_ms,
                    error: result.error,
                }]
            }

            Effect::SampleResources { workflow, unit } => {
                let Ok(status) = self.deps.manager.status(&unit).await else {
                    debug!(unit, "resource sample skipped: status unavailable");
                    return Vec::new();
                };
                let Some(pid) = status.pid else {
                    debug!(unit, "resource sample skipped: no pid");
                    return Vec::new();
                };
                let start = self.clock.now();
                let sample = self.deps.resource_probe.sample(pid).await;
                self.record_activity("sample_resources", start, true);
                vec![Event::ResourcesSampled {
                    workflow,
                    pid,
                    sample,
                }]
            }

            Effect::DispatchAlert { alert } => {
                self.deps.alerts.fire(alert).await;
                Vec::new()
            }

            Effect::ResolveAlerts { service } => {
                self.deps.alerts.resolve_service(&service, self.clock.epoch_ms());
                Vec::new()
            }

            Effect::RecordHealth { event } => {
                if let Some(history) = &self.deps.history {
                    if let Err(e) = history.record_health(&event) {
                        warn!(error = %e, "failed to record health event");
                    }
                }
                Vec::new()
            }

            Effect::RecordRestart {
                service,
                reason,
                success,
            } => {
                if let Some(history) = &self.deps.history {
                    let record = dix_core::RestartEvent {
                        timestamp_ms: self.clock.epoch_ms(),
                        service,
                        reason,
                        success,
                    };
                    if let Err(e) = history.record_restart(&record) {
                        warn!(error = %e, "failed to record restart event");
                    }
                }
                Vec::new()
            }

            Effect::PurgeHistory { cutoff_ms } => {
                if let Some(history) = &self.deps.history {
                    match history.purge_older_than(cutoff_ms) {
                        Ok(dropped) => info!(dropped, "history purge complete"),
                        Err(e) => warn!(error = %e, "history purge failed"),
                    }
                }
                Vec::new()
            }

            Effect::FetchChainHead { run, relay, chain } => {
                let client = Arc::clone(&self.deps.chain);
                let breaker = format!("chain:{relay}:{chain}");
                let result = self
                    .activity("fetch_chain_head", Some(&breaker), || {
                        let client = Arc::clone(&client);
                        let relay = relay.clone();
                        let chain = chain.clone();
                        async move {
                            client
                                .chain_head(&relay, &chain)
                                .await
                                .map_err(|e| e.to_string())
                        }
                    })
                    .await;
                match result {
                    Ok(head) => vec![Event::BatchHeadResolved { run, head }],
                    Err(e) => {
                        warn!(%run, error = %e, "chain head unavailable, abandoning run");
                        vec![Event::BatchFinished { run }]
                    }
                }
            }

            Effect::ScanExistingBlocks {
                run,
                relay,
                chain,
                chunk_start,
                chunk_end,
            } => {
                let client = Arc::clone(&self.deps.chain);
                let breaker = format!("chain:{relay}:{chain}");
                let result = self
                    .activity("scan_existing_blocks", Some(&breaker), || {
                        let client = Arc::clone(&client);
                        let relay = relay.clone();
                        let chain = chain.clone();
                        async move {
                            client
                                .existing_blocks(&relay, &chain, chunk_start, chunk_end)
                                .await
                                .map_err(|e| e.to_string())
                        }
                    })
                    .await;
                match result {
                    Ok(existing) => {
                        let missing = complement(chunk_start, chunk_end, &existing);
                        vec![Event::BatchChunkScanned {
                            run,
                            chunk_start,
                            chunk_end,
                            missing,
                        }]
                    }
                    Err(e) => {
                        warn!(%run, error = %e, "chunk scan failed, abandoning run");
                        vec![Event::BatchFinished { run }]
                    }
                }
            }

            Effect::ProcessBlockBatch {
                run,
                relay,
                chain,
                start,
                len,
            } => {
                let client = Arc::clone(&self.deps.chain);
                let result = self
                    .activity("process_block_batch", None, || {
                        let client = Arc::clone(&client);
                        let relay = relay.clone();
                        let chain = chain.clone();
                        async move {
                            client
                                .process_batch(&relay, &chain, start, len)
                                .await
                                .map_err(|e| e.to_string())
                        }
                    })
                    .await;
                vec![Event::BatchDispatchDone {
                    run,
                    start,
                    len,
                    success: result.is_ok(),
                }]
            }

            Effect::ProcessSingleBlock {
                run,
                relay,
                chain,
                id,
            } => {
                let client = Arc::clone(&self.deps.chain);
                let result = self
                    .activity("process_single_block", None, || {
                        let client = Arc::clone(&client);
                        let relay = relay.clone();
                        let chain = chain.clone();
                        async move {
                            client
                                .process_single(&relay, &chain, id)
                                .await
                                .map_err(|e| e.to_string())
                        }
                    })
                    .await;
                vec![Event::BatchDispatchDone {
                    run,
                    start: id,
                    len: 1,
                    success: result.is_ok(),
                }]
            }

            Effect::RunStat {
                chain,
                stat,
                year,
                month,
            } => {
                let stats = Arc::clone(&self.deps.stats);
                let ts = self
                    .activity("stat_timestamp", None, || {
                        let stats = Arc::clone(&stats);
                        let chain = chain.clone();
                        let stat = stat.clone();
                        async move {
                            stats
                                .stat_timestamp(&chain, &stat, year, month)
                                .await
                                .map_err(|e| e.to_string())
                        }
                    })
                    .await;
                match ts {
                    Ok(ts) if ts != 0 => {
                        return vec![Event::StatComputed {
                            chain,
                            stat,
                            year,
                            month,
                            success: true,
                            skipped: true,
                        }];
                    }
                    Err(e) => {
                        warn!(chain, stat, error = %e, "stat timestamp lookup failed");
                        return vec![Event::StatComputed {
                            chain,
                            stat,
                            year,
                            month,
                            success: false,
                            skipped: false,
                        }];
                    }
                    Ok(_) => {}
                }

                let stats = Arc::clone(&self.deps.stats);
                let result = self
                    .activity("compute_stat", None, || {
                        let stats = Arc::clone(&stats);
                        let chain = chain.clone();
                        let stat = stat.clone();
                        async move {
                            stats
                                .compute(&chain, &stat, year, month)
                                .await
                                .map_err(|e| e.to_string())
                        }
                    })
                    .await;
                vec![Event::StatComputed {
                    chain,
                    stat,
                    year,
                    month,
                    success: result.is_ok(),
                    skipped: false,
                }]
            }
        }
    }

    fn breakers_enabled(&self) -> bool {
        self.deps.settings.get().circuit_breaker_enabled
    }

    /// Run one activity with breaker guard, per-attempt timeout, and retry.
    async fn activity<T, Fut>(
        &self,
        name: &str,
        breaker: Option<&str>,
        mut attempt: impl FnMut() -> Fut,
    ) -> Result<T, String>
    where
        Fut: Future<Output = Result<T, String>>,
    {
        let breaker = breaker.filter(|_| self.breakers_enabled()).map(|b| {
            self.deps.breakers.get(b, self.clock.now())
        });
        if let Some(b) = &breaker {
            if let Err(e) = b.try_acquire(self.clock.now()) {
                self.deps
                    .metrics
                    .inc_counter("activity_errors_total", &[name, "breaker_open"], 1.0);
                return Err(e.to_string());
            }
        }

        let start = self.clock.now();
        let mut last_error = String::new();
        for attempt_no in 1..=self.retry.attempts.max(1) {
            let outcome = tokio::time::timeout(self.retry.timeout, attempt()).await;
            match outcome {
                Ok(Ok(value)) => {
                    self.record_activity(name, start, true);
                    if let Some(b) = &breaker {
                        b.record_success(self.clock.now());
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => {
                    self.deps
                        .metrics
                        .inc_counter("activity_errors_total", &[name, "error"], 1.0);
                    last_error = e;
                }
                Err(_) => {
                    self.deps
                        .metrics
                        .inc_counter("activity_errors_total", &[name, "timeout"], 1.0);
                    last_error = format!("timed out after {:?}", self.retry.timeout);
                }
            }
            if attempt_no < self.retry.attempts {
                tokio::time::sleep(self.retry.delay(attempt_no)).await;
            }
        }

        self.record_activity(name, start, false);
        if let Some(b) = &breaker {
            b.record_failure(self.clock.now());
        }
        debug!(activity = name, error = %last_error, "activity exhausted retries");
        Err(last_error)
    }

    fn record_activity(&self, name: &str, start: std::time::Instant, success: bool) {
        let status = if success { "success" } else { "error" };
        self.deps
            .metrics
            .inc_counter("activity_executions_total", &[name, status], 1.0);
        let elapsed = self.clock.now().duration_since(start).as_secs_f64();
        self.deps
            .metrics
            .observe("activity_duration_seconds", &[name], elapsed);
    }
}

/// IDs in [start, end] absent from the sorted-or-not `existing` set.
fn complement(start: u64, end: u64, existing: &[u64]) -> Vec<u64> {
    let set: std::collections::HashSet<u64> = existing.iter().copied().collect();
    (start..=end).filter(|id| !set.contains(id)).collect()
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
