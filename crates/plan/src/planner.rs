// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure planning function: `plan(config) → FleetPlan`.
//!
//! Verifies port uniqueness across the whole fleet (failing fast with an
//! aggregated error list), derives unit names and canonical ready-signal
//! names, and sorts the emitted plan lexicographically so restart orderings
//! are deterministic across runs.

use crate::config::{FleetConfig, ParaConfig, RelayConfig};
use crate::plan::{clamp_watch_interval, BatchOptions, FleetPlan, ParaPlan, RelayPlan, StatsPlan};
use dix_core::{HttpProbeSpec, NodeDescriptor, ServiceType, SignalName, WorkflowId};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Workflow ID of the root orchestrator; parent of every supervisor.
pub const ROOT_WORKFLOW: &str = "wf.infra";

#[derive(Debug, Error)]
pub enum PlanError {
    /// One or more ports are assigned twice. Lists every collision.
    #[error("port collisions: {}", .0.join("; "))]
    PortCollisions(Vec<String>),
    #[error("duplicate service name: {0}")]
    DuplicateName(String),
    #[error("relay {relay} parachain {chain}: {message}")]
    InvalidPara {
        relay: String,
        chain: String,
        message: String,
    },
}

/// Transform the static fleet configuration into a layered plan.
pub fn plan(config: &FleetConfig) -> Result<FleetPlan, PlanError> {
    check_ports(config)?;

    let mut relays: Vec<RelayPlan> = config.relays.iter().map(|r| plan_relay(config, r)).collect();
    relays.sort_by(|a, b| a.relay.cmp(&b.relay));

    let proxy_unit = config
        .proxy
        .unit
        .clone()
        .unwrap_or_else(|| format!("{}.service", config.proxy.name));
    let proxy = service_descriptor(config, &config.proxy.name, &proxy_unit, ServiceType::Proxy);

    let apps = config
        .apps
        .iter()
        .map(|name| {
            service_descriptor(config, name, &format!("{name}.service"), ServiceType::App)
        })
        .collect();

    let mut chains: Vec<String> = config
        .relays
        .iter()
        .flat_map(|r| r.parachains.iter().map(|p| p.chain.clone()))
        .collect();
    chains.sort();

    let plan = FleetPlan {
        relays,
        proxy,
        apps,
        batch: BatchOptions {
            batch_size: config.batch.batch_size.max(1),
            max_workers: config.batch.max_workers.max(1),
        },
        stats: StatsPlan {
            first_year: config.stats.first_year,
            names: config.stats.names.clone(),
            chains,
        },
    };

    check_unique_names(&plan)?;
    Ok(plan)
}

fn plan_relay(config: &FleetConfig, relay: &RelayConfig) -> RelayPlan {
    let sup = &config.supervision;
    // The relay's logical name doubles as the `node` metric label; the
    // unit name carries the dix- prefix instead.
    let node = NodeDescriptor {
        name: relay.name.clone(),
        unit: format!("dix-relay-{}.service", relay.name),
        service_type: ServiceType::Relay,
        relay: Some(relay.name.clone()),
        chain: None,
        rpc_url: relay.rpc_url.clone(),
        rpc_port: Some(relay.rpc_port),
        check_sync: sup.check_sync,
        http_probe: None,
        ready_signal: SignalName::relay(&relay.name),
        parent_workflow: Some(WorkflowId::new(ROOT_WORKFLOW)),
        watch_interval: clamp_watch_interval(sup.watch_interval_secs),
        max_restarts: sup.max_restarts,
        restart_backoff_base: backoff(sup.restart_backoff_secs),
    };

    let mut paras: Vec<ParaPlan> = relay
        .parachains
        .iter()
        .map(|p| plan_para(config, &relay.name, p))
        .collect();
    paras.sort_by(|a, b| a.chain.cmp(&b.chain));

    RelayPlan {
        relay: relay.name.clone(),
        node,
        paras,
    }
}

fn plan_para(config: &FleetConfig, relay: &str, para: &ParaConfig) -> ParaPlan {
    let sup = &config.supervision;
    let node = NodeDescriptor {
        name: format!("{}-{}-node", relay, para.chain),
        unit: format!("dix-para-{}-{}.service", relay, para.chain),
        service_type: ServiceType::Parachain,
        relay: Some(relay.to_string()),
        chain: Some(para.chain.clone()),
        rpc_url: None,
        rpc_port: Some(para.rpc_port),
        check_sync: sup.check_sync,
        http_probe: None,
        ready_signal: SignalName::para(relay, &para.chain),
        parent_workflow: Some(WorkflowId::new(ROOT_WORKFLOW)),
        watch_interval: clamp_watch_interval(sup.watch_interval_secs),
        max_restarts: sup.max_restarts,
        restart_backoff_base: backoff(sup.restart_backoff_secs),
    };

    let sidecars = (0..para.sidecar_count)
        .map(|i| NodeDescriptor {
            name: format!("{}-{}-sidecar-{}", relay, para.chain, i),
            unit: format!("dix-sidecar-{}-{}-{}.service", relay, para.chain, i),
            service_type: ServiceType::Sidecar,
            relay: Some(relay.to_string()),
            chain: Some(para.chain.clone()),
            rpc_url: None,
            rpc_port: Some(sidecar_port(para, i)),
            check_sync: false,
            http_probe: None,
            ready_signal: SignalName::sidecar(relay, &para.chain, i),
            parent_workflow: Some(WorkflowId::new(ROOT_WORKFLOW)),
            watch_interval: clamp_watch_interval(sup.watch_interval_secs),
            max_restarts: sup.max_restarts,
            restart_backoff_base: backoff(sup.restart_backoff_secs),
        })
        .collect();

    ParaPlan {
        chain: para.chain.clone(),
        node,
        sidecars,
    }
}

fn service_descriptor(
    config: &FleetConfig,
    name: &str,
    unit: &str,
    service_type: ServiceType,
) -> NodeDescriptor {
    let sup = &config.supervision;
    // The frontend exposes a health endpoint worth probing beyond its unit
    // state.
    let http_probe = (name == config.frontend.name).then(|| {
        HttpProbeSpec::get(format!(
            "http://localhost:{}/health",
            config.frontend.port
        ))
        .json_path("status")
    });
    NodeDescriptor {
        name: name.to_string(),
        unit: unit.to_string(),
        service_type,
        relay: None,
        chain: None,
        rpc_url: None,
        rpc_port: None,
        check_sync: false,
        http_probe,
        ready_signal: SignalName::service(name),
        parent_workflow: Some(WorkflowId::new(ROOT_WORKFLOW)),
        watch_interval: clamp_watch_interval(sup.watch_interval_secs),
        max_restarts: sup.max_restarts,
        restart_backoff_base: backoff(sup.restart_backoff_secs),
    }
}

/// Replica i of a parachain's sidecar listens on `base + 1 + i`.
pub fn sidecar_port(para: &ParaConfig, replica: usize) -> u16 {
    para.sidecar_base_port + 1 + replica as u16
}

fn backoff(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

/// Verify every port assignment across the fleet is unique.
fn check_ports(config: &FleetConfig) -> Result<(), PlanError> {
    let mut owners: BTreeMap<u16, Vec<String>> = BTreeMap::new();
    let mut claim = |port: u16, owner: String| {
        owners.entry(port).or_default().push(owner);
    };

    claim(config.database.port, "database".to_string());
    claim(config.frontend.port, format!("frontend {}", config.frontend.name));

    for relay in &config.relays {
        claim(relay.rpc_port, format!("relay {} rpc", relay.name));
        for para in &relay.parachains {
            let id = format!("{}/{}", relay.name, para.chain);
            claim(para.rpc_port, format!("{id} rpc"));
            claim(para.ws_port, format!("{id} ws"));
            claim(para.chainreader_port, format!("{id} chainreader"));
            claim(para.prometheus_port, format!("{id} prometheus"));
            for i in 0..para.sidecar_count {
                claim(sidecar_port(para, i), format!("{id} sidecar {i}"));
            }
        }
    }

    let collisions: Vec<String> = owners
        .iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(port, names)| format!("port {} claimed by {}", port, names.join(", ")))
        .collect();

    if collisions.is_empty() {
        Ok(())
    } else {
        Err(PlanError::PortCollisions(collisions))
    }
}

fn check_unique_names(plan: &FleetPlan) -> Result<(), PlanError> {
    let mut seen = std::collections::HashSet::new();
    for (_, descriptor) in plan.workflows() {
        if !seen.insert(descriptor.name.clone()) {
            return Err(PlanError::DuplicateName(descriptor.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
