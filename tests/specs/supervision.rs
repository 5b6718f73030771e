//! Node supervision: sync gating, restart budget, recovery.

use crate::prelude::*;
use dix_core::{ProcessState, SupervisorPhase, WorkflowId};
use std::time::Duration;

/// Sync gating (one relay, RPC 9944, CheckSync on): the probe reports
/// isSyncing=true/peers=25 for three iterations, then isSyncing=false/
/// peers=30. The ready signal lands exactly once, at iteration 4, and the
/// peer gauge follows 25, 25, 25, 30.
#[tokio::test]
async fn sync_gating_emits_ready_exactly_once_at_iteration_four() {
    let mut fleet = Fleet::new(&single_relay_config());
    fleet
        .manager
        .push_status("dix-relay-polkadot.service", ProcessState::Running);
    for _ in 0..3 {
        fleet.sync.push(false, 25);
    }
    fleet.sync.push(true, 30);

    fleet.start_fleet().await;

    for iteration in 1..=4 {
        fleet.tick(Duration::from_secs(1)).await;
        let expected_peers = if iteration < 4 { 25.0 } else { 30.0 };
        assert_eq!(
            fleet.metrics.value("node_peer_count", &["polkadot", "polkadot"]),
            Some(expected_peers),
            "iteration {iteration}"
        );
        let expected_signals = usize::from(iteration == 4);
        assert_eq!(
            fleet.signal_count("ready:relay:polkadot"),
            expected_signals,
            "iteration {iteration}"
        );
    }

    // Later iterations never re-emit within the run.
    for _ in 0..3 {
        fleet.tick(Duration::from_secs(1)).await;
    }
    assert_eq!(fleet.signal_count("ready:relay:polkadot"), 1);
    assert_eq!(
        fleet.metrics.value("node_sync_status", &["polkadot", "polkadot"]),
        Some(1.0)
    );
}

/// Restart budget: max_restarts=2, backoff base 1s, watch interval 1s, the
/// unit always inactive. Restarts happen at iterations 1 and 2 (the second
/// after a 1s backoff); iteration 3 exhausts the supervisor;
/// service_restarts_total ends at 2.
#[tokio::test]
async fn restart_budget_two_then_exhausted() {
    let mut config = single_relay_config();
    config.supervision.max_restarts = 2;
    let mut fleet = Fleet::new(&config);
    let wf = WorkflowId::relay("polkadot");
    fleet
        .manager
        .push_status("dix-relay-polkadot.service", ProcessState::Stopped);

    fleet.start_fleet().await;

    // Iteration 1: restart issues immediately (restart_count 0 → no sleep).
    fleet.tick(Duration::from_secs(1)).await;
    assert_eq!(fleet.manager.restarts_of("dix-relay-polkadot.service"), 1);

    // Iteration 2: 1s backoff sleep, then the second restart.
    fleet.tick(Duration::from_secs(1)).await;
    assert_eq!(fleet.manager.restarts_of("dix-relay-polkadot.service"), 1);
    fleet.tick(Duration::from_secs(1)).await;
    assert_eq!(fleet.manager.restarts_of("dix-relay-polkadot.service"), 2);

    // Iteration 3: budget spent, Exhausted, no further restarts.
    fleet.tick(Duration::from_secs(1)).await;
    assert_eq!(fleet.supervisor(&wf).phase, SupervisorPhase::Exhausted);
    for _ in 0..5 {
        fleet.tick(Duration::from_secs(1)).await;
    }
    assert_eq!(fleet.manager.restarts_of("dix-relay-polkadot.service"), 2);
    assert_eq!(
        fleet
            .metrics
            .value("service_restarts_total", &["polkadot", "relay"]),
        Some(2.0)
    );
    assert!(fleet.supervisor(&wf).restart_count <= 2);
}

/// max_restarts=0: one failure immediately exhausts, no restart attempted.
#[tokio::test]
async fn zero_budget_exhausts_without_restarting() {
    let mut config = single_relay_config();
    config.supervision.max_restarts = 0;
    let mut fleet = Fleet::new(&config);
    fleet
        .manager
        .push_status("dix-relay-polkadot.service", ProcessState::Stopped);

    fleet.start_fleet().await;
    fleet.tick(Duration::from_secs(1)).await;

    let sup = fleet.supervisor(&WorkflowId::relay("polkadot"));
    assert_eq!(sup.phase, SupervisorPhase::Exhausted);
    assert_eq!(fleet.manager.restarts_of("dix-relay-polkadot.service"), 0);
}

/// Unhealthy → healthy resets consecutive_failures before the next
/// iteration and accounts the downtime.
#[tokio::test]
async fn recovery_resets_failures_and_accounts_downtime() {
    let mut fleet = Fleet::new(&single_relay_config());
    let wf = WorkflowId::relay("polkadot");
    fleet
        .manager
        .push_status("dix-relay-polkadot.service", ProcessState::Stopped);
    fleet
        .manager
        .push_status("dix-relay-polkadot.service", ProcessState::Running);
    fleet.sync.push(true, 40);

    fleet.start_fleet().await;
    fleet.tick(Duration::from_secs(1)).await;
    assert_eq!(fleet.supervisor(&wf).consecutive_failures, 1);

    fleet.tick(Duration::from_secs(1)).await;
    let sup = fleet.supervisor(&wf);
    assert_eq!(sup.phase, SupervisorPhase::Healthy);
    assert_eq!(sup.consecutive_failures, 0);
    assert_eq!(sup.restart_count, 0);

    let downtime = fleet
        .metrics
        .value("service_downtime_seconds_total", &["polkadot", "relay"])
        .unwrap_or_default();
    assert!(downtime >= 1.0, "downtime was {downtime}");
}
