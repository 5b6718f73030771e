// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dix_core::{Event, WorkflowId};
use tempfile::tempdir;

fn state_with_one_supervisor() -> MaterializedState {
    let config = dix_plan::FleetConfig {
        relays: vec![dix_plan::RelayConfig {
            name: "polkadot".to_string(),
            rpc_port: 9944,
            rpc_url: None,
            parachains: vec![],
        }],
        ..dix_plan::FleetConfig::default()
    };
    let mut state = MaterializedState::default();
    state.set_plan(dix_plan::plan(&config).unwrap());
    state.apply_event(
        &Event::SupervisorStarted {
            workflow: WorkflowId::relay("polkadot"),
        },
        1_000,
    );
    state
}

#[test]
fn save_and_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json.zst");

    let snapshot = Snapshot::new(42, state_with_one_supervisor());
    snapshot.save(&path).unwrap();

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.seq, 42);
    assert!(loaded
        .state
        .supervisor(&WorkflowId::relay("polkadot"))
        .is_some());
}

#[test]
fn load_missing_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json.zst");
    assert!(Snapshot::load(&path).unwrap().is_none());
}

#[test]
fn corrupt_snapshot_rotates_to_bak() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json.zst");
    std::fs::write(&path, b"not a snapshot").unwrap();

    assert!(Snapshot::load(&path).unwrap().is_none());
    assert!(!path.exists());
    assert!(dir.path().join("snapshot.json.zst.bak").exists());
}

#[test]
fn save_replaces_previous_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json.zst");

    Snapshot::new(1, MaterializedState::default()).save(&path).unwrap();
    Snapshot::new(2, state_with_one_supervisor()).save(&path).unwrap();

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.seq, 2);
}
