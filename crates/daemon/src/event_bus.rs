// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus for the supervisor daemon.
//!
//! The bus writes events to the WAL before notifying the engine, enabling
//! crash recovery via snapshot + replay. Events are buffered in memory and
//! periodically flushed to disk (~10ms durability window).

use dix_core::Event;
use dix_storage::{Wal, WalEntry, WalError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Event bus backed by the WAL with group commit.
#[derive(Clone)]
pub struct EventBus {
    wal: Arc<Mutex<Wal>>,
    wake_tx: mpsc::Sender<()>,
}

/// Reader side used by the engine loop.
pub struct EventReader {
    wal: Arc<Mutex<Wal>>,
    wake_rx: mpsc::Receiver<()>,
}

impl EventBus {
    /// Create a bus and its reader over the given WAL.
    pub fn new(wal: Wal) -> (Self, EventReader) {
        let wal = Arc::new(Mutex::new(wal));
        let (wake_tx, wake_rx) = mpsc::channel(1);

        (
            Self {
                wal: Arc::clone(&wal),
                wake_tx,
            },
            EventReader { wal, wake_rx },
        )
    }

    /// Append an event to the WAL (buffered, durable at the next flush).
    pub fn send(&self, event: Event) -> Result<u64, WalError> {
        let seq = {
            let mut wal = self.wal.lock();
            wal.append(&event)?
        };
        // Non-blocking wake: a full channel means the engine is already awake.
        let _ = self.wake_tx.try_send(());
        Ok(seq)
    }

    /// Flush the WAL with a single fsync.
    pub fn flush(&self) -> Result<(), WalError> {
        self.wal.lock().flush()
    }

    pub fn needs_flush(&self) -> bool {
        self.wal.lock().needs_flush()
    }
}

impl EventReader {
    /// Wait for and return the next unprocessed event.
    ///
    /// Returns `None` when the bus is closed (all senders dropped).
    pub async fn recv(&mut self) -> Result<Option<WalEntry>, WalError> {
        loop {
            {
                let mut wal = self.wal.lock();
                if let Some(entry) = wal.next_unprocessed()? {
                    return Ok(Some(entry));
                }
            }

            if self.wake_rx.recv().await.is_none() {
                return Ok(None);
            }
        }
    }

    /// Mark an entry processed (persisted via snapshots).
    pub fn mark_processed(&self, seq: u64) {
        self.wal.lock().mark_processed(seq);
    }

    /// Shared WAL handle for the checkpoint task.
    pub fn wal(&self) -> Arc<Mutex<Wal>> {
        Arc::clone(&self.wal)
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
