// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dixsup — supervisory orchestrator for the dix indexer fleet.
//!
//! Architecture:
//! - Engine loop: processes events sequentially from the WAL-backed bus
//! - Activity pool: blocking effects run as spawned tasks; completions
//!   re-enter the loop as events
//! - HTTP tasks: metrics endpoint and dynamic-config API

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod args;
mod event_bus;
mod http;
mod lifecycle;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dix_core::{Clock, Event};
use dix_storage::Snapshot;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::args::Args;
use crate::event_bus::EventBus;
use crate::lifecycle::{LifecycleError, StartupResult, Supervisor};

/// Flush interval for group commit (~10ms durability window)
const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Periodic snapshot + WAL truncation cadence.
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// Timer firing resolution.
const TIMER_CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("dixsup: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), LifecycleError> {
    let paths = lifecycle::Paths::new(&args);
    std::fs::create_dir_all(&paths.state_dir)?;
    let _log_guard = setup_logging(&paths);

    info!(namespace = %args.namespace, watch = args.watch, "starting supervisor");

    let StartupResult {
        supervisor,
        mut event_reader,
        first_boot,
    } = lifecycle::startup(&args)?;

    if args.metrics {
        http::spawn_metrics_server(Arc::clone(&supervisor.metrics), args.metrics_port);
    }
    if args.dynamic_config {
        http::spawn_config_server(supervisor.settings.clone(), args.config_port);
    }

    spawn_flush_task(supervisor.event_bus.clone());
    spawn_checkpoint_task(&supervisor, event_reader.wal());

    supervisor.resume(first_boot).await?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut timer_check = tokio::time::interval(TIMER_CHECK_INTERVAL);

    info!("supervisor ready");

    // Engine loop - processes events sequentially from the WAL.
    loop {
        tokio::select! {
            result = event_reader.recv() => {
                match result {
                    Ok(Some(entry)) => {
                        let seq = entry.seq;
                        match entry.event {
                            Event::Shutdown => {
                                // Control signal: never replayed on restart.
                                event_reader.mark_processed(seq);
                                info!("shutdown event received");
                                break;
                            }
                            event => {
                                process_event(&supervisor, event);
                                event_reader.mark_processed(seq);
                            }
                        }
                    }
                    Ok(None) => {
                        info!("event bus closed");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "error reading from WAL");
                    }
                }
            }

            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }

            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }

            _ = timer_check.tick() => {
                let now = supervisor.clock.now();
                let fired = {
                    let scheduler = supervisor.executor.scheduler();
                    let mut guard = scheduler.lock();
                    guard.fired_timers(now)
                };
                for event in fired {
                    if let Err(e) = supervisor.event_bus.send(event) {
                        error!(error = %e, "failed to enqueue timer event");
                    }
                }
            }
        }
    }

    supervisor.shutdown(event_reader.wal()).await;
    Ok(())
}

/// Handle one event: decide effects against the pre-transition state, apply
/// the event, then execute. Blocking effects run on the activity pool so
/// the loop keeps draining; their completions re-enter via the bus.
fn process_event(supervisor: &Supervisor, event: Event) {
    let effects = supervisor.runtime.handle_event(&event);
    supervisor
        .state
        .lock()
        .apply_event(&event, supervisor.clock.epoch_ms());

    for effect in effects {
        let executor = Arc::clone(&supervisor.executor);
        let bus = supervisor.event_bus.clone();
        if effect.is_blocking() {
            tokio::spawn(async move {
                for event in executor.execute(effect).await {
                    if let Err(e) = bus.send(event) {
                        error!(error = %e, "failed to enqueue activity completion");
                    }
                }
            });
        } else {
            // Timer and emit effects complete synchronously in order.
            for event in execute_inline(executor, effect) {
                if let Err(e) = bus.send(event) {
                    error!(error = %e, "failed to enqueue event");
                }
            }
        }
    }
}

/// Non-blocking effects (Emit, SetTimer, CancelTimer) never await; run them
/// to completion on the spot without yielding to the scheduler.
fn execute_inline(
    executor: Arc<dix_engine::Executor<dix_core::SystemClock>>,
    effect: dix_core::Effect,
) -> Vec<Event> {
    match effect {
        dix_core::Effect::Emit { event } => vec![event],
        dix_core::Effect::SetTimer { id, duration } => {
            let scheduler = executor.scheduler();
            let now = executor.clock().now();
            scheduler.lock().set_timer(&id, duration, now);
            Vec::new()
        }
        dix_core::Effect::CancelTimer { id } => {
            executor.scheduler().lock().cancel_timer(&id);
            Vec::new()
        }
        other => {
            error!(effect = other.name(), "blocking effect on the inline path");
            Vec::new()
        }
    }
}

fn spawn_flush_task(event_bus: EventBus) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(FLUSH_INTERVAL);
        loop {
            interval.tick().await;
            if event_bus.needs_flush() {
                if let Err(e) = event_bus.flush() {
                    error!(error = %e, "failed to flush event bus");
                }
            }
        }
    });
}

/// Periodic snapshot; the WAL is truncated only after the snapshot is
/// durable on disk.
fn spawn_checkpoint_task(
    supervisor: &Supervisor,
    wal: Arc<parking_lot::Mutex<dix_storage::Wal>>,
) {
    let state = Arc::clone(&supervisor.state);
    let snapshot_path = supervisor.paths.snapshot_path.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let (seq, snapshot_state) = {
                let wal = wal.lock();
                (wal.processed_seq(), state.lock().clone())
            };
            let path = snapshot_path.clone();
            let wal = Arc::clone(&wal);
            let result = tokio::task::spawn_blocking(move || {
                Snapshot::new(seq, snapshot_state).save(&path)?;
                wal.lock()
                    .truncate_through(seq)
                    .map_err(|e| dix_storage::SnapshotError::Io(std::io::Error::other(e)))
            })
            .await;
            match result {
                Ok(Ok(())) => info!(seq, "checkpoint complete"),
                Ok(Err(e)) => error!(error = %e, "checkpoint failed"),
                Err(e) => error!(error = %e, "checkpoint task panicked"),
            }
        }
    });
}

fn setup_logging(paths: &lifecycle::Paths) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(
        paths.log_path.parent().unwrap_or(&paths.state_dir),
        paths
            .log_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "dixsup.log".into()),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    guard
}
