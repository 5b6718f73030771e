// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dix_core::{BatchRunId, Event, ProcessState};
use dix_plan::{plan, FleetConfig, ParaConfig, RelayConfig};

fn test_plan() -> dix_plan::FleetPlan {
    let config = FleetConfig {
        relays: vec![RelayConfig {
            name: "polkadot".to_string(),
            rpc_port: 9944,
            rpc_url: None,
            parachains: vec![ParaConfig {
                chain: "assethub".to_string(),
                rpc_port: 9950,
                ws_port: 9951,
                chainreader_port: 9952,
                prometheus_port: 9953,
                sidecar_base_port: 10050,
                sidecar_count: 2,
            }],
        }],
        ..FleetConfig::default()
    };
    plan(&config).unwrap()
}

fn state_with_plan() -> MaterializedState {
    let mut state = MaterializedState::default();
    state.set_plan(test_plan());
    state
}

fn checked(state: &mut MaterializedState, wf: &WorkflowId, ps: ProcessState, at: u64) {
    state.apply_event(
        &Event::StateChecked {
            workflow: wf.clone(),
            state: ps,
            error: None,
        },
        at,
    );
}

#[test]
fn supervisor_started_inserts_from_plan() {
    let mut state = state_with_plan();
    let wf = WorkflowId::relay("polkadot");
    state.apply_event(&Event::SupervisorStarted { workflow: wf.clone() }, 1000);

    let sup = state.supervisor(&wf).unwrap();
    assert_eq!(sup.phase, SupervisorPhase::Starting);
    assert_eq!(sup.descriptor.unit, "dix-relay-polkadot.service");
    assert_eq!(sup.run_id, 1);
}

#[test]
fn restarting_a_supervisor_begins_a_new_run() {
    let mut state = state_with_plan();
    let wf = WorkflowId::relay("polkadot");
    state.apply_event(&Event::SupervisorStarted { workflow: wf.clone() }, 0);
    state.apply_event(
        &Event::Ready {
            signal: SignalName::relay("polkadot"),
            from: wf.clone(),
        },
        0,
    );
    assert!(state.supervisor(&wf).unwrap().ready_emitted);

    state.apply_event(&Event::SupervisorStarted { workflow: wf.clone() }, 0);
    let sup = state.supervisor(&wf).unwrap();
    assert_eq!(sup.run_id, 2);
    assert!(!sup.ready_emitted, "new run re-arms the ready latch");
}

#[test]
fn unknown_workflow_is_ignored() {
    let mut state = state_with_plan();
    let wf = WorkflowId::relay("unknown");
    state.apply_event(&Event::SupervisorStarted { workflow: wf.clone() }, 0);
    assert!(state.supervisor(&wf).is_none());
}

#[test]
fn unhealthy_increments_consecutive_failures() {
    let mut state = state_with_plan();
    let wf = WorkflowId::relay("polkadot");
    state.apply_event(&Event::SupervisorStarted { workflow: wf.clone() }, 0);

    checked(&mut state, &wf, ProcessState::Stopped, 1_000);
    checked(&mut state, &wf, ProcessState::Stopped, 2_000);

    let sup = state.supervisor(&wf).unwrap();
    assert_eq!(sup.consecutive_failures, 2);
    assert_eq!(sup.phase, SupervisorPhase::Degraded);
    assert_eq!(sup.unhealthy_since_ms, 1_000);
}

#[test]
fn recovery_resets_counters() {
    let mut state = state_with_plan();
    let wf = WorkflowId::relay("polkadot");
    state.apply_event(&Event::SupervisorStarted { workflow: wf.clone() }, 0);

    checked(&mut state, &wf, ProcessState::Stopped, 1_000);
    state.apply_event(
        &Event::RestartFinished {
            workflow: wf.clone(),
            success: true,
        },
        1_500,
    );
    assert_eq!(state.supervisor(&wf).unwrap().restart_count, 1);

    checked(&mut state, &wf, ProcessState::Running, 2_000);
    let sup = state.supervisor(&wf).unwrap();
    assert_eq!(sup.phase, SupervisorPhase::Healthy);
    assert_eq!(sup.consecutive_failures, 0);
    assert_eq!(sup.restart_count, 0);
    assert_eq!(sup.unhealthy_since_ms, 0);
    assert_eq!(sup.last_healthy_at_ms, 2_000);
}

#[test]
fn exhausted_phase_sticks_while_unhealthy() {
    let mut state = state_with_plan();
    let wf = WorkflowId::relay("polkadot");
    state.apply_event(&Event::SupervisorStarted { workflow: wf.clone() }, 0);
    state.apply_event(&Event::SupervisorExhausted { workflow: wf.clone() }, 0);

    checked(&mut state, &wf, ProcessState::Stopped, 1_000);
    assert_eq!(state.supervisor(&wf).unwrap().phase, SupervisorPhase::Exhausted);

    // Recovery still resets the budget.
    checked(&mut state, &wf, ProcessState::Running, 2_000);
    let sup = state.supervisor(&wf).unwrap();
    assert_eq!(sup.phase, SupervisorPhase::Healthy);
    assert_eq!(sup.restart_count, 0);
}

#[test]
fn ready_signal_feeds_waiters_and_latch() {
    let mut state = state_with_plan();
    let relay_wf = WorkflowId::relay("polkadot");
    let para_wf = WorkflowId::para("polkadot", "assethub");
    let relay_signal = SignalName::relay("polkadot");

    state.apply_event(&Event::SupervisorStarted { workflow: relay_wf.clone() }, 0);
    state.apply_event(
        &Event::WaiterStarted {
            workflow: para_wf.clone(),
            deps: vec![relay_signal.clone()],
            required_any: false,
        },
        0,
    );
    assert!(!state.waiters[&para_wf].deps_met());

    state.apply_event(
        &Event::Ready {
            signal: relay_signal.clone(),
            from: relay_wf.clone(),
        },
        0,
    );

    assert!(state.waiters[&para_wf].deps_met());
    assert!(state.supervisor(&relay_wf).unwrap().ready_emitted);
    assert!(state.orchestrator.has_seen(&relay_signal));
    assert_eq!(state.orchestrator.signal_log, vec![relay_signal]);
}

#[test]
fn required_any_waiter_is_met_by_one_signal() {
    let mut state = state_with_plan();
    let wf = WorkflowId::service("dixfe");
    state.apply_event(
        &Event::WaiterStarted {
            workflow: wf.clone(),
            deps: vec![SignalName::service("a"), SignalName::service("b")],
            required_any: true,
        },
        0,
    );
    state.apply_event(
        &Event::Ready {
            signal: SignalName::service("b"),
            from: WorkflowId::service("b"),
        },
        0,
    );
    assert!(state.waiters[&wf].deps_met());
}

#[test]
fn dependency_timeout_unblocks_progression() {
    let mut state = state_with_plan();
    let wf = WorkflowId::service("dixfe");
    let dep = SignalName::service("dix-nginx");
    state.apply_event(
        &Event::WaiterStarted {
            workflow: wf.clone(),
            deps: vec![dep.clone()],
            required_any: false,
        },
        0,
    );
    state.apply_event(
        &Event::DependencyTimedOut {
            workflow: wf.clone(),
            dependency: dep.clone(),
        },
        0,
    );
    let w = &state.waiters[&wf];
    assert!(w.deps_met());
    assert!(w.timed_out.contains(&dep));
}

#[yare::parameterized(
    spec_example  = { &[10, 11, 12, 14, 15, 20], 2, vec![(10, 2), (12, 1), (14, 2), (20, 1)] },
    single_size   = { &[1, 2, 3], 1, vec![(1, 1), (2, 1), (3, 1)] },
    all_one_batch = { &[5, 6, 7], 10, vec![(5, 3)] },
    empty         = { &[], 4, vec![] },
    gaps_only     = { &[1, 3, 5], 4, vec![(1, 1), (3, 1), (5, 1)] },
)]
fn partitions_continuous_batches(missing: &[u64], size: u32, expected: Vec<(u64, u32)>) {
    assert_eq!(partition_batches(missing, size), expected);
}

#[test]
fn batch_run_lifecycle() {
    let mut state = state_with_plan();
    let run = BatchRunId::new("run-1");

    state.apply_event(
        &Event::BatchRequested {
            run: run.clone(),
            relay: "polkadot".to_string(),
            chain: "assethub".to_string(),
            start_range: 0,
            end_range: -1,
        },
        0,
    );
    assert_eq!(state.batch_runs[&run].end_range, -1);
    assert!(state.batch_runs[&run].resolved_end().is_none());

    state.apply_event(&Event::BatchHeadResolved { run: run.clone(), head: 250_000 }, 0);
    assert_eq!(state.batch_runs[&run].resolved_end(), Some(250_000));

    state.apply_event(
        &Event::BatchChunkScanned {
            run: run.clone(),
            chunk_start: 0,
            chunk_end: 99_999,
            missing: vec![10, 11, 12, 14],
        },
        0,
    );
    let r = &state.batch_runs[&run];
    assert_eq!(r.next_chunk_start, 100_000);
    // Default plan batch_size is 100, so one continuous run of 3 + single.
    assert_eq!(r.pending, vec![(10, 3), (14, 1)]);

    state.apply_event(&Event::BatchDispatched { run: run.clone(), start: 10, len: 3 }, 0);
    let r = &state.batch_runs[&run];
    assert_eq!(r.pending, vec![(14, 1)]);
    assert_eq!(r.in_flight, vec![(10, 3)]);

    state.apply_event(
        &Event::BatchDispatchDone {
            run: run.clone(),
            start: 10,
            len: 3,
            success: true,
        },
        0,
    );
    let r = &state.batch_runs[&run];
    assert!(r.in_flight.is_empty());
    assert_eq!(r.processed, 3);

    state.apply_event(&Event::BatchContinued { run: run.clone(), next_start: 100_000 }, 0);
    assert_eq!(state.batch_runs[&run].processed, 0);
    assert_eq!(state.batch_runs[&run].start_range, 100_000);

    state.apply_event(&Event::BatchFinished { run: run.clone() }, 0);
    assert!(state.batch_runs[&run].finished);
}

#[test]
fn replay_reconstructs_identical_state() {
    let events = vec![
        Event::FleetStarted,
        Event::SupervisorStarted {
            workflow: WorkflowId::relay("polkadot"),
        },
        Event::StateChecked {
            workflow: WorkflowId::relay("polkadot"),
            state: ProcessState::Stopped,
            error: None,
        },
        Event::RestartFinished {
            workflow: WorkflowId::relay("polkadot"),
            success: true,
        },
        Event::StateChecked {
            workflow: WorkflowId::relay("polkadot"),
            state: ProcessState::Running,
            error: None,
        },
        Event::Ready {
            signal: SignalName::relay("polkadot"),
            from: WorkflowId::relay("polkadot"),
        },
    ];

    let mut live = state_with_plan();
    for e in &events {
        live.apply_event(e, 7_000);
    }

    let mut replayed = state_with_plan();
    for e in &events {
        replayed.apply_event(e, 7_000);
    }

    let a = serde_json::to_value(&live).unwrap();
    let b = serde_json::to_value(&replayed).unwrap();
    assert_eq!(a, b);
}
