// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity clients for the batch and periodic-query orchestrators.
//!
//! The block pipeline and the SQL statistics runner are external
//! collaborators; these traits are the interface the engine consumes. The
//! HTTP implementations talk to the sidecar / frontend services the fleet
//! itself supervises.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const HEAD_TIMEOUT: Duration = Duration::from_secs(15);
/// Batch writes may take a while on a cold database.
const BATCH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Chain access for the batch orchestrator.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Current chain head block number.
    async fn chain_head(&self, relay: &str, chain: &str) -> Result<u64, IndexerError>;

    /// IDs within [start, end] already persisted to the database.
    async fn existing_blocks(
        &self,
        relay: &str,
        chain: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<u64>, IndexerError>;

    /// Fetch and store a continuous batch starting at `start`.
    async fn process_batch(
        &self,
        relay: &str,
        chain: &str,
        start: u64,
        len: u32,
    ) -> Result<(), IndexerError>;

    /// Fetch and store a single block.
    async fn process_single(&self, relay: &str, chain: &str, id: u64) -> Result<(), IndexerError>;
}

/// Statistic recomputation for the periodic query runner.
#[async_trait]
pub trait StatsRunner: Send + Sync + 'static {
    /// Stored completion timestamp for a tuple; 0 means never computed.
    async fn stat_timestamp(
        &self,
        chain: &str,
        stat: &str,
        year: i32,
        month: u32,
    ) -> Result<u64, IndexerError>;

    /// Recompute one statistic for one (chain, year, month).
    async fn compute(
        &self,
        chain: &str,
        stat: &str,
        year: i32,
        month: u32,
    ) -> Result<(), IndexerError>;
}

#[derive(Deserialize)]
struct HeadResponse {
    number: String,
}

/// HTTP client against the sidecar (chain head) and the frontend's
/// chainreader API (existing blocks, batch ingestion, statistics).
#[derive(Clone)]
pub struct SidecarClient {
    client: reqwest::Client,
    /// e.g. `http://localhost:8080` — the proxy routes per relay/chain.
    base_url: String,
}

impl SidecarClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, relay: &str, chain: &str, path: &str) -> String {
        format!("{}/{}/{}/{}", self.base_url, relay, chain, path)
    }

    async fn expect_2xx(response: reqwest::Response) -> Result<reqwest::Response, IndexerError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(IndexerError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl ChainClient for SidecarClient {
    async fn chain_head(&self, relay: &str, chain: &str) -> Result<u64, IndexerError> {
        let response = self
            .client
            .get(self.url(relay, chain, "blocks/head"))
            .timeout(HEAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| IndexerError::Request(e.to_string()))?;
        let response = Self::expect_2xx(response).await?;

        let head: HeadResponse = response
            .json()
            .await
            .map_err(|e| IndexerError::Malformed(e.to_string()))?;
        head.number
            .parse()
            .map_err(|_| IndexerError::Malformed(format!("head number {:?}", head.number)))
    }

    async fn existing_blocks(
        &self,
        relay: &str,
        chain: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<u64>, IndexerError> {
        let url = format!(
            "{}?start={}&end={}",
            self.url(relay, chain, "blocks/existing"),
            start,
            end
        );
        let response = self
            .client
            .get(url)
            .timeout(BATCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| IndexerError::Request(e.to_string()))?;
        let response = Self::expect_2xx(response).await?;
        response
            .json()
            .await
            .map_err(|e| IndexerError::Malformed(e.to_string()))
    }

    async fn process_batch(
        &self,
        relay: &str,
        chain: &str,
        start: u64,
        len: u32,
    ) -> Result<(), IndexerError> {
        let response = self
            .client
            .post(self.url(relay, chain, "blocks/batch"))
            .timeout(BATCH_TIMEOUT)
            .json(&serde_json::json!({ "start": start, "len": len }))
            .send()
            .await
            .map_err(|e| IndexerError::Request(e.to_string()))?;
        Self::expect_2xx(response).await.map(|_| ())
    }

    async fn process_single(&self, relay: &str, chain: &str, id: u64) -> Result<(), IndexerError> {
        let response = self
            .client
            .post(self.url(relay, chain, &format!("blocks/{id}")))
            .timeout(BATCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| IndexerError::Request(e.to_string()))?;
        Self::expect_2xx(response).await.map(|_| ())
    }
}

#[derive(Deserialize)]
struct TimestampResponse {
    timestamp: u64,
}

#[async_trait]
impl StatsRunner for SidecarClient {
    async fn stat_timestamp(
        &self,
        chain: &str,
        stat: &str,
        year: i32,
        month: u32,
    ) -> Result<u64, IndexerError> {
        let url = format!(
            "{}/stats/{}/{}/{}/{}",
            self.base_url, chain, stat, year, month
        );
        let response = self
            .client
            .get(url)
            .timeout(HEAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| IndexerError::Request(e.to_string()))?;
        // A tuple that was never computed has no row yet.
        if response.status().as_u16() == 404 {
            return Ok(0);
        }
        let response = Self::expect_2xx(response).await?;
        let ts: TimestampResponse = response
            .json()
            .await
            .map_err(|e| IndexerError::Malformed(e.to_string()))?;
        Ok(ts.timestamp)
    }

    async fn compute(
        &self,
        chain: &str,
        stat: &str,
        year: i32,
        month: u32,
    ) -> Result<(), IndexerError> {
        let url = format!(
            "{}/stats/{}/{}/{}/{}/compute",
            self.base_url, chain, stat, year, month
        );
        let response = self
            .client
            .post(url)
            // Expensive SQL aggregation gets a long leash.
            .timeout(Duration::from_secs(1800))
            .send()
            .await
            .map_err(|e| IndexerError::Request(e.to_string()))?;
        Self::expect_2xx(response).await.map(|_| ())
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    /// Scriptable in-memory chain for batch orchestrator tests.
    #[derive(Clone, Default)]
    pub struct FakeChainClient {
        inner: Arc<Mutex<FakeChainInner>>,
    }

    #[derive(Default)]
    struct FakeChainInner {
        head: u64,
        existing: HashSet<u64>,
        processed: Vec<(u64, u32)>,
    }

    impl FakeChainClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_head(&self, head: u64) {
            self.inner.lock().head = head;
        }

        pub fn set_existing(&self, ids: impl IntoIterator<Item = u64>) {
            self.inner.lock().existing = ids.into_iter().collect();
        }

        /// Every dispatched (start, len) pair, singles included, in order.
        pub fn processed(&self) -> Vec<(u64, u32)> {
            self.inner.lock().processed.clone()
        }
    }

    #[async_trait]
    impl ChainClient for FakeChainClient {
        async fn chain_head(&self, _relay: &str, _chain: &str) -> Result<u64, IndexerError> {
            Ok(self.inner.lock().head)
        }

        async fn existing_blocks(
            &self,
            _relay: &str,
            _chain: &str,
            start: u64,
            end: u64,
        ) -> Result<Vec<u64>, IndexerError> {
            let inner = self.inner.lock();
            let mut ids: Vec<u64> = inner
                .existing
                .iter()
                .copied()
                .filter(|id| (start..=end).contains(id))
                .collect();
            ids.sort_unstable();
            Ok(ids)
        }

        async fn process_batch(
            &self,
            _relay: &str,
            _chain: &str,
            start: u64,
            len: u32,
        ) -> Result<(), IndexerError> {
            self.inner.lock().processed.push((start, len));
            Ok(())
        }

        async fn process_single(
            &self,
            _relay: &str,
            _chain: &str,
            id: u64,
        ) -> Result<(), IndexerError> {
            self.inner.lock().processed.push((id, 1));
            Ok(())
        }
    }

    /// Scriptable stats runner recording computed tuples.
    #[derive(Clone, Default)]
    pub struct FakeStatsRunner {
        inner: Arc<Mutex<FakeStatsInner>>,
    }

    #[derive(Default)]
    struct FakeStatsInner {
        timestamps: HashMap<(String, String, i32, u32), u64>,
        computed: Vec<(String, String, i32, u32)>,
    }

    impl FakeStatsRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_timestamp(&self, chain: &str, stat: &str, year: i32, month: u32, ts: u64) {
            self.inner
                .lock()
                .timestamps
                .insert((chain.to_string(), stat.to_string(), year, month), ts);
        }

        pub fn computed(&self) -> Vec<(String, String, i32, u32)> {
            self.inner.lock().computed.clone()
        }
    }

    #[async_trait]
    impl StatsRunner for FakeStatsRunner {
        async fn stat_timestamp(
            &self,
            chain: &str,
            stat: &str,
            year: i32,
            month: u32,
        ) -> Result<u64, IndexerError> {
            Ok(*self
                .inner
                .lock()
                .timestamps
                .get(&(chain.to_string(), stat.to_string(), year, month))
                .unwrap_or(&0))
        }

        async fn compute(
            &self,
            chain: &str,
            stat: &str,
            year: i32,
            month: u32,
        ) -> Result<(), IndexerError> {
            self.inner
                .lock()
                .computed
                .push((chain.to_string(), stat.to_string(), year, month));
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeChainClient, FakeStatsRunner};

#[cfg(test)]
#[path = "indexer_tests.rs"]
mod tests;
