// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP endpoint probe.
//!
//! Reads at most the first KiB of the response body. Probe failures never
//! raise to the workflow layer; every outcome is a structured result with
//! `healthy = false` on any error.

use dix_core::http_probe::{json_leaf_healthy, walk_json_path};
use dix_core::{HttpProbeResult, HttpProbeSpec};
use reqwest::Method;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cap on how much of the response body is read.
const BODY_LIMIT: usize = 1024;

#[derive(Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn probe(&self, spec: &HttpProbeSpec) -> HttpProbeResult {
        let start = Instant::now();
        let result = self.probe_inner(spec, start).await;
        debug!(
            url = %spec.url,
            healthy = result.healthy,
            status = result.status,
            "http probe"
        );
        result
    }

    async fn probe_inner(&self, spec: &HttpProbeSpec, start: Instant) -> HttpProbeResult {
        let method = match Method::from_bytes(spec.method.as_bytes()) {
            Ok(m) => m,
            Err(_) => {
                return HttpProbeResult::unhealthy(
                    format!("invalid method: {}", spec.method),
                    elapsed_ms(start),
                )
            }
        };

        let mut request = self
            .client
            .request(method, &spec.url)
            .timeout(Duration::from_millis(spec.timeout_ms));
        for (key, value) in &spec.headers {
            request = request.header(key, value);
        }

        let mut response = match request.send().await {
            Ok(r) => r,
            Err(e) => return HttpProbeResult::unhealthy(e.to_string(), elapsed_ms(start)),
        };

        let status = response.status().as_u16();
        if !spec.status_ok(status) {
            return HttpProbeResult {
                healthy: false,
                status,
                elapsed_ms: elapsed_ms(start),
                error: Some(format!("unexpected status {status}")),
            };
        }

        // Body checks only read the first KiB.
        let needs_body = spec.response_contains.is_some() || spec.json_path.is_some();
        let body = if needs_body {
            match read_limited(&mut response).await {
                Ok(b) => b,
                Err(e) => return HttpProbeResult::unhealthy(e, elapsed_ms(start)),
            }
        } else {
            String::new()
        };

        if let Some(needle) = &spec.response_contains {
            if !body.contains(needle.as_str()) {
                return HttpProbeResult {
                    healthy: false,
                    status,
                    elapsed_ms: elapsed_ms(start),
                    error: Some(format!("response does not contain {needle:?}")),
                };
            }
        }

        if let Some(path) = &spec.json_path {
            let healthy = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .as_ref()
                .and_then(|root| walk_json_path(root, path))
                .map(json_leaf_healthy)
                .unwrap_or(false);
            if !healthy {
                return HttpProbeResult {
                    healthy: false,
                    status,
                    elapsed_ms: elapsed_ms(start),
                    error: Some(format!("json path {path} is not healthy")),
                };
            }
        }

        HttpProbeResult {
            healthy: true,
            status,
            elapsed_ms: elapsed_ms(start),
            error: None,
        }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Read response chunks up to the body limit, then stop.
async fn read_limited(response: &mut reqwest::Response) -> Result<String, String> {
    let mut buf: Vec<u8> = Vec::with_capacity(BODY_LIMIT);
    while buf.len() < BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let room = BODY_LIMIT - buf.len();
                buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
            Ok(None) => break,
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
