// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake process manager for deterministic tests.
//!
//! Scripts status responses per process name and records every call so
//! tests can assert on the exact operation sequence.

use super::{ProcessError, ProcessManager};
use async_trait::async_trait;
use dix_core::{ProcessConfig, ProcessState, ProcessStatus};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// One recorded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessCall {
    Start(String),
    Stop(String),
    Restart(String),
    Status(String),
    Kill(String),
    Close,
}

#[derive(Default)]
struct FakeInner {
    calls: Vec<ProcessCall>,
    /// Scripted status queue per name; the last entry repeats once drained.
    statuses: HashMap<String, VecDeque<ProcessStatus>>,
    /// Names whose restart should fail.
    failing_restarts: HashMap<String, String>,
    output: HashMap<String, Vec<String>>,
}

#[derive(Clone, Default)]
pub struct FakeProcessManager {
    inner: Arc<Mutex<FakeInner>>,
}

impl FakeProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a scripted status for a process. Once the queue drains, the
    /// last status repeats.
    pub fn push_status(&self, name: &str, state: ProcessState) {
        self.push_full_status(name, state, Some(4242));
    }

    pub fn push_full_status(&self, name: &str, state: ProcessState, pid: Option<u32>) {
        self.inner
            .lock()
            .statuses
            .entry(name.to_string())
            .or_default()
            .push_back(ProcessStatus {
                name: name.to_string(),
                state,
                pid,
                exit_code: None,
                restart_count: 0,
            });
    }

    pub fn fail_restart(&self, name: &str, message: &str) {
        self.inner
            .lock()
            .failing_restarts
            .insert(name.to_string(), message.to_string());
    }

    pub fn set_output(&self, name: &str, lines: Vec<String>) {
        self.inner.lock().output.insert(name.to_string(), lines);
    }

    pub fn calls(&self) -> Vec<ProcessCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of restarts issued for a name.
    pub fn restarts_of(&self, name: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ProcessCall::Restart(n) if n == name))
            .count()
    }
}

#[async_trait]
impl ProcessManager for FakeProcessManager {
    async fn start(&self, config: &ProcessConfig) -> Result<(), ProcessError> {
        self.inner.lock().calls.push(ProcessCall::Start(config.name.clone()));
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), ProcessError> {
        self.inner.lock().calls.push(ProcessCall::Stop(name.to_string()));
        Ok(())
    }

    async fn restart(&self, name: &str) -> Result<(), ProcessError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProcessCall::Restart(name.to_string()));
        if let Some(message) = inner.failing_restarts.get(name) {
            return Err(ProcessError::OperationFailed(message.clone()));
        }
        Ok(())
    }

    async fn status(&self, name: &str) -> Result<ProcessStatus, ProcessError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProcessCall::Status(name.to_string()));
        let queue = inner
            .statuses
            .get_mut(name)
            .ok_or_else(|| ProcessError::NotFound(name.to_string()))?;
        if queue.len() > 1 {
            if let Some(front) = queue.pop_front() {
                return Ok(front);
            }
        }
        queue
            .front()
            .cloned()
            .ok_or_else(|| ProcessError::NotFound(name.to_string()))
    }

    async fn output(&self, name: &str, lines: usize) -> Result<Vec<String>, ProcessError> {
        let inner = self.inner.lock();
        let all = inner
            .output
            .get(name)
            .ok_or_else(|| ProcessError::NotFound(name.to_string()))?;
        let start = all.len().saturating_sub(lines);
        Ok(all[start..].to_vec())
    }

    async fn kill(&self, name: &str) -> Result<(), ProcessError> {
        self.inner.lock().calls.push(ProcessCall::Kill(name.to_string()));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProcessStatus>, ProcessError> {
        let inner = self.inner.lock();
        Ok(inner
            .statuses
            .iter()
            .filter_map(|(_, q)| q.front().cloned())
            .collect())
    }

    async fn close(&self) -> Result<(), ProcessError> {
        self.inner.lock().calls.push(ProcessCall::Close);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
