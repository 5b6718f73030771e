// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical signal names and workflow identifiers.
//!
//! The fleet topology is expressed entirely through named ready signals and
//! deterministic workflow IDs. The planner derives them at load time and the
//! supervision runtime matches on them at delivery, so the two sides agree
//! without any runtime registry.

crate::define_id! {
    /// Name of a one-way ready notification (e.g. `ready:relay:polkadot`).
    pub struct SignalName;
}

crate::define_id! {
    /// Deterministic identifier for a workflow instance.
    ///
    /// The ID doubles as the at-most-one-concurrent-execution key: state for
    /// a workflow is stored under its ID, so starting the same workflow twice
    /// is a no-op.
    pub struct WorkflowId;
}

crate::define_id! {
    /// Identifier for a batch indexing run.
    pub struct BatchRunId;
}

impl SignalName {
    pub fn relay(relay: &str) -> Self {
        Self::new(format!("ready:relay:{relay}"))
    }

    pub fn para(relay: &str, chain: &str) -> Self {
        Self::new(format!("ready:para:{relay}:{chain}"))
    }

    pub fn sidecar(relay: &str, chain: &str, replica: usize) -> Self {
        Self::new(format!("ready:sidecar:{relay}:{chain}:{replica}"))
    }

    pub fn service(name: &str) -> Self {
        Self::new(format!("ready:svc:{name}"))
    }
}

impl WorkflowId {
    pub fn relay(relay: &str) -> Self {
        Self::new(format!("wf.node.relay.{relay}"))
    }

    pub fn para(relay: &str, chain: &str) -> Self {
        Self::new(format!("wf.node.para.{relay}.{chain}"))
    }

    pub fn sidecar(relay: &str, chain: &str, replica: usize) -> Self {
        Self::new(format!("wf.sidecar.{relay}.{chain}.{replica}"))
    }

    pub fn service(name: &str) -> Self {
        Self::new(format!("wf.svc.{name}"))
    }

    pub fn batch(run: &BatchRunId) -> Self {
        Self::new(format!("wf.batch.{run}"))
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
