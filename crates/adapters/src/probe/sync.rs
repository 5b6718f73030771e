// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC `system_health` probe.
//!
//! Wire format: request `{"id":1,"jsonrpc":"2.0","method":"system_health","params":[]}`,
//! response `result.isSyncing: bool, result.peers: int, result.shouldHavePeers: bool`.

use super::ProbeError;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SYNC_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one sync probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    /// `!result.isSyncing` — the node has caught up with the chain head.
    pub synced: bool,
    pub peers: u32,
    pub should_have_peers: bool,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    result: HealthResult,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthResult {
    is_syncing: bool,
    #[serde(default)]
    peers: u32,
    #[serde(default)]
    should_have_peers: bool,
}

/// Client for the node RPC `system_health` call.
#[derive(Clone)]
pub struct SyncProber {
    client: reqwest::Client,
}

impl SyncProber {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Probe the node at `endpoint` (e.g. `http://localhost:9944`).
    pub async fn check(&self, endpoint: &str) -> Result<SyncStatus, ProbeError> {
        let body = serde_json::json!({
            "id": 1,
            "jsonrpc": "2.0",
            "method": "system_health",
            "params": [],
        });

        let response = self
            .client
            .post(endpoint)
            .timeout(SYNC_PROBE_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| ProbeError::Malformed(e.to_string()))?;

        let result = SyncStatus {
            synced: !envelope.result.is_syncing,
            peers: envelope.result.peers,
            should_have_peers: envelope.result.should_have_peers,
        };
        debug!(endpoint, synced = result.synced, peers = result.peers, "sync probe");
        Ok(result)
    }
}

impl Default for SyncProber {
    fn default() -> Self {
        Self::new()
    }
}
