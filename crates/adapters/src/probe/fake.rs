// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake probes for deterministic tests.

use super::{HttpProbe, ProbeError, ResourceProbe, SyncProbe, SyncStatus};
use async_trait::async_trait;
use dix_core::{HttpProbeResult, HttpProbeSpec, ResourceSample};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Sync probe with a scripted result queue; the last result repeats.
#[derive(Clone, Default)]
pub struct FakeSyncProbe {
    results: Arc<Mutex<VecDeque<Result<SyncStatus, String>>>>,
}

impl FakeSyncProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, synced: bool, peers: u32) {
        self.results.lock().push_back(Ok(SyncStatus {
            synced,
            peers,
            should_have_peers: true,
        }));
    }

    pub fn push_error(&self, message: &str) {
        self.results.lock().push_back(Err(message.to_string()));
    }
}

#[async_trait]
impl SyncProbe for FakeSyncProbe {
    async fn check(&self, _endpoint: &str) -> Result<SyncStatus, ProbeError> {
        let mut queue = self.results.lock();
        let result = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match result {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(ProbeError::Request(message)),
            None => Err(ProbeError::Request("no scripted result".to_string())),
        }
    }
}

/// HTTP probe returning a scripted result.
#[derive(Clone)]
pub struct FakeHttpProbe {
    result: Arc<Mutex<HttpProbeResult>>,
}

impl FakeHttpProbe {
    pub fn healthy() -> Self {
        Self {
            result: Arc::new(Mutex::new(HttpProbeResult {
                healthy: true,
                status: 200,
                elapsed_ms: 1,
                error: None,
            })),
        }
    }

    pub fn set(&self, result: HttpProbeResult) {
        *self.result.lock() = result;
    }
}

#[async_trait]
impl HttpProbe for FakeHttpProbe {
    async fn probe(&self, _spec: &HttpProbeSpec) -> HttpProbeResult {
        self.result.lock().clone()
    }
}

/// Resource probe returning a fixed sample.
#[derive(Clone, Default)]
pub struct FakeResourceProbe {
    sample: Arc<Mutex<ResourceSample>>,
}

impl FakeResourceProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, sample: ResourceSample) {
        *self.sample.lock() = sample;
    }
}

#[async_trait]
impl ResourceProbe for FakeResourceProbe {
    async fn sample(&self, _pid: u32) -> ResourceSample {
        *self.sample.lock()
    }
}
