// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the dix supervisor: WAL, materialized state,
//! snapshots, and the health history store.

mod history;
mod snapshot;
mod state;
mod wal;

pub use history::{DowntimeStats, HistoryError, HistoryStore};
pub use snapshot::{Snapshot, SnapshotError};
pub use state::{
    partition_batches, BatchRunState, MaterializedState, OrchestratorState, WaiterState,
};
pub use wal::{Wal, WalEntry, WalError};
