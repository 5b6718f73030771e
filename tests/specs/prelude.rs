//! Shared harness: a deterministic in-process engine.
//!
//! Same handle → apply → execute loop as the daemon, but single-stepped
//! and driven by a fake clock, so timelines are exact.

use dix_adapters::{
    FakeChainClient, FakeHttpProbe, FakeProcessManager, FakeResourceProbe, FakeStatsRunner,
    FakeSyncProbe,
};
use dix_core::{Clock, Event, FakeClock, SettingsHandle, SupervisorState, WorkflowId};
use dix_engine::{
    AlertManager, BreakerConfig, BreakerManager, Executor, ExecutorDeps, Metrics, RetryPolicy,
    Runtime, Scheduler,
};
use dix_plan::FleetConfig;
use dix_storage::MaterializedState;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

pub struct Fleet {
    pub runtime: Runtime<FakeClock>,
    pub executor: Executor<FakeClock>,
    pub state: Arc<Mutex<MaterializedState>>,
    pub clock: FakeClock,
    pub manager: FakeProcessManager,
    pub sync: FakeSyncProbe,
    pub chain: FakeChainClient,
    pub metrics: Arc<Metrics>,
    pub settings: SettingsHandle,
    queue: VecDeque<Event>,
}

impl Fleet {
    pub fn new(config: &FleetConfig) -> Self {
        let plan = dix_plan::plan(config).expect("plan");
        let clock = FakeClock::new();
        clock.set_epoch_ms(1_700_000_000_000);

        let mut state = MaterializedState::default();
        state.set_plan(plan);
        let state = Arc::new(Mutex::new(state));

        let settings = SettingsHandle::default();
        let metrics = Metrics::new("");
        let manager = FakeProcessManager::new();
        let sync = FakeSyncProbe::new();
        let chain = FakeChainClient::new();

        let runtime = Runtime::new(
            Arc::clone(&state),
            settings.clone(),
            Arc::clone(&metrics),
            clock.clone(),
        );
        let deps = ExecutorDeps {
            manager: Arc::new(manager.clone()),
            sync_probe: Arc::new(sync.clone()),
            http_probe: Arc::new(FakeHttpProbe::healthy()),
            resource_probe: Arc::new(FakeResourceProbe::new()),
            chain: Arc::new(chain.clone()),
            stats: Arc::new(FakeStatsRunner::new()),
            alerts: Arc::new(AlertManager::new(
                Vec::new(),
                settings.clone(),
                Arc::clone(&metrics),
                None,
            )),
            history: None,
            breakers: Arc::new(BreakerManager::new(
                BreakerConfig::from_settings(&settings.get()),
                Arc::clone(&metrics),
            )),
            metrics: Arc::clone(&metrics),
            settings: settings.clone(),
        };
        let executor = Executor::new(
            deps,
            Arc::new(Mutex::new(Scheduler::new())),
            RetryPolicy::none(),
            false,
            clock.clone(),
        );

        Self {
            runtime,
            executor,
            state,
            clock,
            manager,
            sync,
            chain,
            metrics,
            settings,
            queue: VecDeque::new(),
        }
    }

    /// Inject an event and drain the engine to quiescence.
    pub async fn send(&mut self, event: Event) {
        self.queue.push_back(event);
        self.pump().await;
    }

    pub async fn start_fleet(&mut self) {
        self.send(Event::FleetStarted).await;
    }

    async fn pump(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            let effects = self.runtime.handle_event(&event);
            self.state
                .lock()
                .apply_event(&event, self.clock.epoch_ms());
            for effect in effects {
                let events = self.executor.execute(effect).await;
                self.queue.extend(events);
            }
        }
    }

    /// Advance time, fire due timers, drain to quiescence.
    pub async fn tick(&mut self, duration: Duration) {
        self.clock.advance(duration);
        let fired = {
            let scheduler = self.executor.scheduler();
            let mut guard = scheduler.lock();
            guard.fired_timers(self.clock.now())
        };
        self.queue.extend(fired);
        self.pump().await;
    }

    pub fn supervisor(&self, workflow: &WorkflowId) -> SupervisorState {
        self.state
            .lock()
            .supervisors
            .get(workflow)
            .cloned()
            .expect("supervisor exists")
    }

    /// Observed ready-signal timeline, in delivery order.
    pub fn signal_log(&self) -> Vec<String> {
        self.state
            .lock()
            .orchestrator
            .signal_log
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn signal_count(&self, name: &str) -> usize {
        self.signal_log().iter().filter(|s| *s == name).count()
    }
}

/// One relay `polkadot` with RPC 9944, sync-gated, nothing else.
pub fn single_relay_config() -> FleetConfig {
    let mut config = FleetConfig::default();
    config.apps.clear();
    config.relays = vec![dix_plan::RelayConfig {
        name: "polkadot".to_string(),
        rpc_port: 9944,
        rpc_url: None,
        parachains: vec![],
    }];
    config.supervision.watch_interval_secs = 1;
    config.supervision.restart_backoff_secs = 1;
    config.supervision.check_sync = true;
    config
}
