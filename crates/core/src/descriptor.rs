// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node descriptors: everything a supervisor needs to watch one service.

use crate::http_probe::HttpProbeSpec;
use crate::signal::{SignalName, WorkflowId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Role of a supervised service within the fleet, used as the `type` label
/// on metrics and history records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Relay,
    Parachain,
    Sidecar,
    Proxy,
    App,
}

crate::simple_display! {
    ServiceType {
        Relay => "relay",
        Parachain => "parachain",
        Sidecar => "sidecar",
        Proxy => "proxy",
        App => "app",
    }
}

/// Static description of one supervised service.
///
/// Produced by the planner, consumed by the supervision runtime. The
/// descriptor is immutable for the lifetime of a fleet run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Logical name, unique across the fleet.
    pub name: String,
    /// Unit identifier interpreted by the process manager.
    pub unit: String,
    pub service_type: ServiceType,
    /// Relay chain this service belongs to, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<String>,
    /// Chain this service serves, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    /// RPC endpoint used by the sync probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_port: Option<u16>,
    /// Whether readiness is gated on the node reporting itself synced.
    pub check_sync: bool,
    /// HTTP endpoint probed while the service is healthy, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_probe: Option<HttpProbeSpec>,
    /// Signal emitted to the parent workflow once the service is ready.
    pub ready_signal: SignalName,
    /// Parent workflow that receives health updates and the ready signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_workflow: Option<WorkflowId>,
    /// Poll cadence, clamped to [1s, 10min] at plan time.
    #[serde(with = "duration_secs")]
    pub watch_interval: Duration,
    pub max_restarts: u32,
    /// Base for the linear restart backoff (attempt n sleeps n * base).
    #[serde(with = "duration_secs")]
    pub restart_backoff_base: Duration,
}

impl NodeDescriptor {
    /// RPC URL for the sync probe, falling back to localhost + port.
    pub fn sync_endpoint(&self) -> Option<String> {
        if let Some(url) = &self.rpc_url {
            return Some(url.clone());
        }
        self.rpc_port.map(|p| format!("http://localhost:{p}"))
    }
}

/// Serde helper storing durations as whole seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(any(test, feature = "test-support"))]
impl NodeDescriptor {
    /// Descriptor with test defaults: a relay named `polkadot` polling every second.
    pub fn test_relay(name: &str) -> Self {
        Self {
            name: name.to_string(),
            unit: format!("{name}.service"),
            service_type: ServiceType::Relay,
            relay: Some(name.to_string()),
            chain: None,
            rpc_url: None,
            rpc_port: Some(9944),
            check_sync: true,
            http_probe: None,
            ready_signal: SignalName::relay(name),
            parent_workflow: None,
            watch_interval: Duration::from_secs(1),
            max_restarts: 3,
            restart_backoff_base: Duration::from_secs(1),
        }
    }
}
