//! Fleet start ordering across relay → parachain → sidecars → proxy → apps.

use crate::prelude::*;
use dix_core::ProcessState;
use dix_plan::{FleetConfig, ParaConfig, RelayConfig};
use std::time::Duration;

fn full_fleet_config() -> FleetConfig {
    let mut config = FleetConfig::default();
    config.apps = vec!["dixfe".to_string()];
    config.relays = vec![RelayConfig {
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
    }];
    config.supervision.watch_interval_secs = 1;
    config
}

/// Relay R, parachain P with two sidecars, app `dixfe`: the observed signal
/// timeline satisfies ready(R) < ready(P) < ready(sidecars) < ready(proxy)
/// < ready(app).
#[tokio::test]
async fn signals_respect_the_topological_partial_order() {
    let mut fleet = Fleet::new(&full_fleet_config());
    for unit in [
        "dix-relay-polkadot.service",
        "dix-para-polkadot-assethub.service",
        "dix-sidecar-polkadot-assethub-0.service",
        "dix-sidecar-polkadot-assethub-1.service",
        "dix-nginx.service",
        "dixfe.service",
    ] {
        fleet.manager.push_status(unit, ProcessState::Running);
    }
    fleet.sync.push(true, 30);

    fleet.start_fleet().await;
    for _ in 0..10 {
        fleet.tick(Duration::from_secs(1)).await;
    }

    let log = fleet.signal_log();
    let pos = |name: &str| {
        log.iter()
            .position(|s| s == name)
            .unwrap_or_else(|| panic!("missing {name} in {log:?}"))
    };

    let relay = pos("ready:relay:polkadot");
    let para = pos("ready:para:polkadot:assethub");
    let sidecar0 = pos("ready:sidecar:polkadot:assethub:0");
    let sidecar1 = pos("ready:sidecar:polkadot:assethub:1");
    let proxy = pos("ready:svc:dix-nginx");
    let app = pos("ready:svc:dixfe");

    assert!(relay < para, "relay before parachain");
    assert!(para < sidecar0 && para < sidecar1, "parachain before sidecars");
    assert!(sidecar0 < proxy && sidecar1 < proxy, "both sidecars before proxy");
    assert!(proxy < app, "proxy before app services");
}

/// No parachain supervisor exists before the relay signal; no app before
/// the proxy signal.
#[tokio::test]
async fn children_are_not_started_early() {
    let mut fleet = Fleet::new(&full_fleet_config());
    // The relay never syncs, so nothing past phase 1 may start.
    fleet
        .manager
        .push_status("dix-relay-polkadot.service", ProcessState::Running);
    fleet.sync.push(false, 5);

    fleet.start_fleet().await;
    for _ in 0..5 {
        fleet.tick(Duration::from_secs(1)).await;
    }

    let state = fleet.state.lock();
    assert!(state
        .supervisors
        .contains_key(&dix_core::WorkflowId::relay("polkadot")));
    assert!(!state
        .supervisors
        .contains_key(&dix_core::WorkflowId::para("polkadot", "assethub")));
    assert!(!state
        .supervisors
        .contains_key(&dix_core::WorkflowId::service("dix-nginx")));
    assert!(state.waiters.is_empty());
}
