// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor lifecycle: startup wiring, recovery, graceful shutdown.

use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use dix_adapters::{
    AlertChannel, ChatWebhookChannel, DirectManager, EmailChannel, HttpProber, LogChannel,
    ProcessManager, ResourceSampler, SidecarClient, SyncProber, SystemdManager, WebhookChannel,
};
use dix_core::{Event, Settings, SettingsHandle, SystemClock};
use dix_engine::{
    AlertManager, BreakerConfig, BreakerManager, Executor, ExecutorDeps, Metrics, RetryPolicy,
    Runtime, Scheduler,
};
use dix_plan::FleetConfig;
use dix_storage::{HistoryStore, MaterializedState, Snapshot, Wal};

use crate::args::Args;
use crate::event_bus::{EventBus, EventReader};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("config error: {0}")]
    Config(#[from] dix_plan::ConfigError),
    #[error("plan error: {0}")]
    Plan(#[from] dix_plan::PlanError),
    #[error("storage error: {0}")]
    Storage(#[from] dix_storage::WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] dix_storage::SnapshotError),
    #[error("history error: {0}")]
    History(#[from] dix_storage::HistoryError),
    #[error("process manager error: {0}")]
    Process(#[from] dix_adapters::ProcessError),
    #[error("another supervisor holds the lock at {0}")]
    LockFailed(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolved filesystem layout under the state directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub wal_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub history_dir: PathBuf,
    pub pid_dir: PathBuf,
    pub process_log_dir: PathBuf,
}

impl Paths {
    pub fn new(args: &Args) -> Self {
        let state_dir = args.state_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .unwrap_or_else(|| PathBuf::from("/var/lib"))
                .join("dixsup")
                .join(&args.namespace)
        });
        Self {
            lock_path: state_dir.join("dixsup.pid"),
            log_path: state_dir.join("dixsup.log"),
            wal_path: state_dir.join("wal").join("events.wal"),
            snapshot_path: state_dir.join("snapshot.json.zst"),
            history_dir: args
                .health_history_db
                .clone()
                .unwrap_or_else(|| state_dir.join("history")),
            pid_dir: args
                .process_pid_dir
                .clone()
                .unwrap_or_else(|| state_dir.join("pids")),
            process_log_dir: args
                .process_log_dir
                .clone()
                .unwrap_or_else(|| state_dir.join("logs")),
            state_dir,
        }
    }
}

/// Everything the engine loop needs, fully wired.
pub struct Supervisor {
    pub paths: Paths,
    pub state: Arc<Mutex<MaterializedState>>,
    pub runtime: Runtime<SystemClock>,
    pub executor: Arc<Executor<SystemClock>>,
    pub event_bus: EventBus,
    pub manager: Arc<dyn ProcessManager>,
    pub metrics: Arc<Metrics>,
    pub settings: SettingsHandle,
    pub clock: SystemClock,
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

pub struct StartupResult {
    pub supervisor: Supervisor,
    pub event_reader: EventReader,
    /// True on the very first run of this state dir (fleet not yet started).
    pub first_boot: bool,
}

/// Wire the supervisor: lock, plan, recover, reconcile.
pub fn startup(args: &Args) -> Result<StartupResult, LifecycleError> {
    let paths = Paths::new(args);
    std::fs::create_dir_all(&paths.state_dir)?;

    let lock_file = acquire_lock(&paths)?;

    // Plan the fleet from configuration. Port collisions and malformed
    // plans refuse startup here.
    let fleet = FleetConfig::load(&args.conf)?;
    let plan = dix_plan::plan(&fleet)?;
    info!(
        relays = plan.relays.len(),
        apps = plan.apps.len(),
        "fleet planned"
    );

    // Recover state: snapshot + WAL replay.
    let clock = SystemClock;
    let snapshot = Snapshot::load(&paths.snapshot_path)?;
    let (mut state, processed_seq) = match snapshot {
        Some(s) => (s.state, s.seq),
        None => (MaterializedState::default(), 0),
    };
    let mut wal = Wal::open(&paths.wal_path, processed_seq)?;
    let mut replayed = 0u64;
    while let Some(entry) = wal.next_unprocessed()? {
        state.apply_event(&entry.event, dix_core::Clock::epoch_ms(&clock));
        wal.mark_processed(entry.seq);
        replayed += 1;
    }
    if replayed > 0 {
        info!(replayed, "WAL replay complete");
    }
    state.set_plan(plan.clone());
    let first_boot = !state.orchestrator.running;

    let settings = SettingsHandle::new(settings_from_args(args));
    let metrics = Metrics::new(&settings.get().metrics_namespace);
    let state = Arc::new(Mutex::new(state));

    let history = if args.health_history {
        Some(Arc::new(HistoryStore::open(&paths.history_dir)?))
    } else {
        None
    };

    let manager: Arc<dyn ProcessManager> = match args.process_manager {
        crate::args::ManagerKind::Systemd => Arc::new(SystemdManager::new()),
        crate::args::ManagerKind::Direct => Arc::new(DirectManager::with_default_max_restarts(
            &paths.pid_dir,
            &paths.process_log_dir,
            args.process_max_restarts,
        )?),
    };

    let alerts = Arc::new(AlertManager::new(
        alert_channels(args),
        settings.clone(),
        Arc::clone(&metrics),
        history.clone(),
    ));

    let frontend_base = format!("http://localhost:{}", fleet.frontend.port);
    let sidecar = Arc::new(SidecarClient::new(frontend_base));

    let deps = ExecutorDeps {
        manager: Arc::clone(&manager),
        sync_probe: Arc::new(SyncProber::new()),
        http_probe: Arc::new(HttpProber::new()),
        resource_probe: Arc::new(ResourceSampler::new()),
        chain: Arc::clone(&sidecar) as Arc<dyn dix_adapters::ChainClient>,
        stats: sidecar,
        alerts,
        history,
        breakers: Arc::new(BreakerManager::new(
            BreakerConfig::from_settings(&settings.get()),
            Arc::clone(&metrics),
        )),
        metrics: Arc::clone(&metrics),
        settings: settings.clone(),
    };
    let executor = Arc::new(Executor::new(
        deps,
        Arc::new(Mutex::new(Scheduler::new())),
        RetryPolicy::default(),
        args.watch,
        clock.clone(),
    ));
    let runtime = Runtime::new(
        Arc::clone(&state),
        settings.clone(),
        Arc::clone(&metrics),
        clock.clone(),
    );

    let (event_bus, event_reader) = EventBus::new(wal);

    Ok(StartupResult {
        supervisor: Supervisor {
            paths,
            state,
            runtime,
            executor,
            event_bus,
            manager,
            metrics,
            settings,
            clock,
            lock_file,
        },
        event_reader,
        first_boot,
    })
}

impl Supervisor {
    /// First boot starts the fleet; later boots reconcile timers and
    /// in-flight work from the recovered state.
    pub async fn resume(&self, first_boot: bool) -> Result<(), LifecycleError> {
        if first_boot {
            self.event_bus.send(Event::FleetStarted)?;
            return Ok(());
        }
        let effects = self.runtime.reconcile();
        for effect in effects {
            for event in self.executor.execute(effect).await {
                self.event_bus.send(event)?;
            }
        }
        Ok(())
    }

    /// Graceful shutdown: flush, checkpoint, stop children.
    pub async fn shutdown(&self, wal: Arc<Mutex<Wal>>) {
        if let Err(e) = self.event_bus.flush() {
            warn!(error = %e, "final WAL flush failed");
        }

        let (seq, snapshot_state) = {
            let wal = wal.lock();
            (wal.processed_seq(), self.state.lock().clone())
        };
        if let Err(e) = Snapshot::new(seq, snapshot_state).save(&self.paths.snapshot_path) {
            warn!(error = %e, "final snapshot failed");
        } else if let Err(e) = wal.lock().truncate_through(seq) {
            warn!(error = %e, "final WAL truncation failed");
        }

        if let Err(e) = self.manager.close().await {
            warn!(error = %e, "process manager close failed");
        }
        info!("supervisor stopped");
    }
}

fn acquire_lock(paths: &Paths) -> Result<File, LifecycleError> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&paths.lock_path)?;
    if file.try_lock_exclusive().is_err() {
        return Err(LifecycleError::LockFailed(paths.lock_path.clone()));
    }
    let mut file = file;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Seed the dynamic settings from CLI feature flags.
fn settings_from_args(args: &Args) -> Settings {
    let mut settings = Settings::default();
    settings.alerts_enabled = args.alerts;
    settings.resource_monitoring_enabled = args.resource_monitoring;
    settings.circuit_breaker_enabled = args.circuit_breaker;
    settings.metrics_port = args.metrics_port;
    settings
}

fn alert_channels(args: &Args) -> Vec<Box<dyn AlertChannel>> {
    let mut channels: Vec<Box<dyn AlertChannel>> = vec![Box::new(LogChannel)];
    if let Some(url) = &args.webhook_url {
        channels.push(Box::new(WebhookChannel::new(url.clone())));
    }
    if let Some(url) = &args.slack_webhook {
        channels.push(Box::new(ChatWebhookChannel::new(url.clone())));
    }
    channels.push(Box::new(EmailChannel));
    channels
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
