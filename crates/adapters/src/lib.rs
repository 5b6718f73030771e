// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dix-adapters: everything that touches the outside world.
//!
//! - [`process`] — pluggable process manager (systemd bus + direct backends)
//! - [`probe`] — sync probe, HTTP endpoint probe, /proc resource sampler
//! - [`alert`] — alert channels (log, webhook, chat webhook, email)
//! - [`indexer`] — activity clients for the batch and stats orchestrators

pub mod alert;
pub mod indexer;
pub mod probe;
pub mod process;
mod subprocess;

pub use alert::{AlertChannel, ChannelError, ChatWebhookChannel, EmailChannel, LogChannel, WebhookChannel};
pub use indexer::{ChainClient, IndexerError, SidecarClient, StatsRunner};
pub use probe::{
    HttpProbe, HttpProber, ProbeError, ResourceProbe, ResourceSampler, SyncProbe, SyncProber,
    SyncStatus,
};
pub use process::{DirectManager, ProcessError, ProcessManager, SystemdManager};

#[cfg(any(test, feature = "test-support"))]
pub use indexer::{FakeChainClient, FakeStatsRunner};
#[cfg(any(test, feature = "test-support"))]
pub use probe::{FakeHttpProbe, FakeResourceProbe, FakeSyncProbe};
#[cfg(any(test, feature = "test-support"))]
pub use process::FakeProcessManager;
