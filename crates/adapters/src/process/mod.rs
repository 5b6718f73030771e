// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable process management.
//!
//! Two production backends share one contract: the systemd backend maps
//! every operation onto the service bus, the direct backend spawns and
//! supervises child processes itself. The workflow layer never sees the
//! difference; new backends (container, cluster) slot in behind the trait.

mod direct;
mod systemd;

pub use direct::DirectManager;
pub use systemd::SystemdManager;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProcessManager, ProcessCall};

use async_trait::async_trait;
use dix_core::{ProcessConfig, ProcessStatus};
use thiserror::Error;

/// Errors from process manager operations
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("process not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
    #[error("operation timed out: {0}")]
    Timeout(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Uniform lifecycle contract over process backends.
#[async_trait]
pub trait ProcessManager: Send + Sync + 'static {
    /// Start a process (idempotent in the eventual-state sense).
    async fn start(&self, config: &ProcessConfig) -> Result<(), ProcessError>;

    /// Stop a process gracefully (terminate, wait, escalate to kill).
    async fn stop(&self, name: &str) -> Result<(), ProcessError>;

    /// Restart a process.
    async fn restart(&self, name: &str) -> Result<(), ProcessError>;

    /// Current status of a process.
    async fn status(&self, name: &str) -> Result<ProcessStatus, ProcessError>;

    /// The last `lines` captured output lines (direct backend only).
    async fn output(&self, name: &str, lines: usize) -> Result<Vec<String>, ProcessError>;

    /// Kill a process immediately.
    async fn kill(&self, name: &str) -> Result<(), ProcessError>;

    /// Status of every known process.
    async fn list(&self) -> Result<Vec<ProcessStatus>, ProcessError>;

    /// Shut the manager down: terminate children, wait, kill survivors.
    async fn close(&self) -> Result<(), ProcessError>;

    /// Backend name for logs and metrics.
    fn name(&self) -> &'static str;
}
