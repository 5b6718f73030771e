// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The layered fleet plan consumed by the root orchestrator.

use dix_core::{NodeDescriptor, SignalName, WorkflowId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete startup plan: relays → parachains → sidecars → proxy → apps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetPlan {
    pub relays: Vec<RelayPlan>,
    pub proxy: NodeDescriptor,
    /// Application services, started after the proxy in this order.
    pub apps: Vec<NodeDescriptor>,
    pub batch: BatchOptions,
    pub stats: StatsPlan,
}

impl FleetPlan {
    /// Look up a descriptor by its workflow ID.
    pub fn descriptor(&self, workflow: &WorkflowId) -> Option<&NodeDescriptor> {
        self.workflows().find_map(|(wf, d)| (wf == *workflow).then_some(d))
    }

    /// All (workflow id, descriptor) pairs in topological start order.
    pub fn workflows(&self) -> impl Iterator<Item = (WorkflowId, &NodeDescriptor)> {
        let relays = self
            .relays
            .iter()
            .map(|r| (WorkflowId::relay(&r.relay), &r.node));
        let paras = self.relays.iter().flat_map(|r| {
            r.paras
                .iter()
                .map(move |p| (WorkflowId::para(&r.relay, &p.chain), &p.node))
        });
        let sidecars = self.relays.iter().flat_map(|r| {
            r.paras.iter().flat_map(move |p| {
                p.sidecars
                    .iter()
                    .enumerate()
                    .map(move |(i, d)| (WorkflowId::sidecar(&r.relay, &p.chain, i), d))
            })
        });
        let proxy = std::iter::once((WorkflowId::service(&self.proxy.name), &self.proxy));
        let apps = self
            .apps
            .iter()
            .map(|d| (WorkflowId::service(&d.name), d));
        relays.chain(paras).chain(sidecars).chain(proxy).chain(apps)
    }

    /// Every sidecar ready signal across the plan (the `AllSidecars` set).
    pub fn all_sidecar_signals(&self) -> Vec<SignalName> {
        self.relays
            .iter()
            .flat_map(|r| {
                r.paras.iter().flat_map(move |p| {
                    (0..p.sidecars.len()).map(move |i| SignalName::sidecar(&r.relay, &p.chain, i))
                })
            })
            .collect()
    }

    /// All chains across all relays, for the periodic query runner.
    pub fn chains(&self) -> Vec<String> {
        self.relays
            .iter()
            .flat_map(|r| r.paras.iter().map(|p| p.chain.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayPlan {
    pub relay: String,
    pub node: NodeDescriptor,
    pub paras: Vec<ParaPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParaPlan {
    pub chain: String,
    pub node: NodeDescriptor,
    /// Expanded sidecar replica descriptors (index i serves port base+1+i).
    pub sidecars: Vec<NodeDescriptor>,
}

/// Knobs for the batch block-indexing orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    pub batch_size: u32,
    pub max_workers: u32,
}

/// Inputs for the periodic query runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsPlan {
    pub first_year: i32,
    pub names: Vec<String>,
    pub chains: Vec<String>,
}

/// Clamp a configured watch interval into the legal [1s, 10min] range.
pub fn clamp_watch_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(1, 600))
}
