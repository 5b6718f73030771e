// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet configuration file (TOML).
//!
//! The configuration describes the static shape of the fleet; the planner
//! validates it and derives the runtime plan. Parsing is deliberately thin:
//! all cross-field invariants (port uniqueness, interval clamping) are
//! enforced by the planner, not here.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// Application services started after the proxy, in order.
    #[serde(default = "default_apps")]
    pub apps: Vec<String>,
    #[serde(default, rename = "relay")]
    pub relays: Vec<RelayConfig>,
    #[serde(default)]
    pub supervision: SupervisionConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

impl FleetConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&data)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub port: u16,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { port: 5432 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub name: String,
    pub port: u16,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            name: "dixfe".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub name: String,
    /// Unit identifier; defaults to `<name>.service`.
    pub unit: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            name: "dix-nginx".to_string(),
            unit: None,
        }
    }
}

fn default_apps() -> Vec<String> {
    vec![
        "dixfe".to_string(),
        "dixlive".to_string(),
        "dixbatch".to_string(),
        "dixstats".to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub name: String,
    pub rpc_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(default, rename = "parachain")]
    pub parachains: Vec<ParaConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParaConfig {
    pub chain: String,
    pub rpc_port: u16,
    pub ws_port: u16,
    pub chainreader_port: u16,
    pub prometheus_port: u16,
    /// Replica i listens on `sidecar_base_port + 1 + i`.
    pub sidecar_base_port: u16,
    #[serde(default)]
    pub sidecar_count: usize,
}

/// Global supervision defaults applied to every descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisionConfig {
    pub watch_interval_secs: u64,
    pub max_restarts: u32,
    pub restart_backoff_secs: u64,
    /// Gate node readiness on the sync probe (relays and parachains).
    pub check_sync: bool,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            watch_interval_secs: 30,
            max_restarts: 3,
            restart_backoff_secs: 5,
            check_sync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: u32,
    pub max_workers: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_workers: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// First year covered by the daily full recomputation.
    pub first_year: i32,
    /// Registered statistic names.
    pub names: Vec<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            first_year: 2020,
            names: vec![
                "blocks".to_string(),
                "extrinsics".to_string(),
                "events".to_string(),
            ],
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            frontend: FrontendConfig::default(),
            proxy: ProxyConfig::default(),
            apps: default_apps(),
            relays: Vec::new(),
            supervision: SupervisionConfig::default(),
            batch: BatchConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
