// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health probe clients: sync probe, HTTP endpoint probe, resource sampler.

mod http;
mod resource;
mod sync;

pub use http::HttpProber;
pub use resource::ResourceSampler;
pub use sync::{SyncProber, SyncStatus};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeHttpProbe, FakeResourceProbe, FakeSyncProbe};

use async_trait::async_trait;
use dix_core::{HttpProbeResult, HttpProbeSpec, ResourceSample};
use thiserror::Error;

/// Errors from probe activities.
///
/// Only the sync probe raises these to the activity layer (where the retry
/// policy applies); the HTTP probe and resource sampler degrade to
/// unhealthy / zeroed results instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Sync probe contract (JSON-RPC `system_health`).
#[async_trait]
pub trait SyncProbe: Send + Sync + 'static {
    async fn check(&self, endpoint: &str) -> Result<SyncStatus, ProbeError>;
}

#[async_trait]
impl SyncProbe for SyncProber {
    async fn check(&self, endpoint: &str) -> Result<SyncStatus, ProbeError> {
        SyncProber::check(self, endpoint).await
    }
}

/// HTTP endpoint probe contract. Never errors; failures surface in the result.
#[async_trait]
pub trait HttpProbe: Send + Sync + 'static {
    async fn probe(&self, spec: &HttpProbeSpec) -> HttpProbeResult;
}

#[async_trait]
impl HttpProbe for HttpProber {
    async fn probe(&self, spec: &HttpProbeSpec) -> HttpProbeResult {
        HttpProber::probe(self, spec).await
    }
}

/// Resource sampler contract. Missing data degrades to zeroed fields.
#[async_trait]
pub trait ResourceProbe: Send + Sync + 'static {
    async fn sample(&self, pid: u32) -> ResourceSample;
}

#[async_trait]
impl ResourceProbe for ResourceSampler {
    async fn sample(&self, pid: u32) -> ResourceSample {
        ResourceSampler::sample(self, pid).await
    }
}
