// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP endpoint probe spec, result, and the JSON-path health evaluation.
//!
//! The wire I/O lives in the adapters crate; the classification logic is
//! pure and lives here so it can be tested without a server.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Probe description for one HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpProbeSpec {
    pub url: String,
    /// Default GET.
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// 0 means "any 2xx"; otherwise the exact status is required.
    #[serde(default)]
    pub expected_status: u16,
    /// Default 5000.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Substring that must appear in the (truncated) body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_contains: Option<String>,
    /// Dot-separated path into the JSON body; the leaf decides health.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl HttpProbeSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: HashMap::new(),
            expected_status: 0,
            timeout_ms: default_timeout_ms(),
            response_contains: None,
            json_path: None,
        }
    }

    crate::setters! {
        set {
            expected_status: u16,
            timeout_ms: u64,
        }
        option {
            response_contains: String,
            json_path: String,
        }
    }

    /// Whether the received status satisfies the expectation.
    pub fn status_ok(&self, status: u16) -> bool {
        if self.expected_status == 0 {
            (200..300).contains(&status)
        } else {
            status == self.expected_status
        }
    }
}

/// Structured probe outcome. Probe failures never raise to the workflow
/// layer; they surface here as `healthy = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpProbeResult {
    pub healthy: bool,
    pub status: u16,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HttpProbeResult {
    pub fn unhealthy(error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            healthy: false,
            status: 0,
            elapsed_ms,
            error: Some(error.into()),
        }
    }
}

/// Walk a dot-separated path through JSON object keys.
pub fn walk_json_path<'a>(root: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Classify a JSON leaf value as healthy.
///
/// Healthy leaves: boolean true, a string in {"healthy","ok","up","ready","true"},
/// or a number > 0. Everything else is unhealthy.
pub fn json_leaf_healthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => {
            matches!(s.as_str(), "healthy" | "ok" | "up" | "ready" | "true")
        }
        serde_json::Value::Number(n) => n.as_f64().map(|f| f > 0.0).unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
#[path = "http_probe_tests.rs"]
mod tests;
