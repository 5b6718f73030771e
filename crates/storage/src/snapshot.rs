// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for crash recovery.
//!
//! Snapshots store the complete materialized state at a point in time,
//! identified by the WAL sequence number. Recovery loads the snapshot and
//! replays WAL entries after that sequence. Snapshots are zstd-compressed
//! JSON, written atomically (tmp + rename) so a crash mid-save never
//! corrupts the previous one.

use crate::MaterializedState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// zstd level 3: fast enough for a periodic background task.
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A snapshot of the materialized state at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// WAL sequence number at the time of snapshot
    pub seq: u64,
    pub state: MaterializedState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(seq: u64, state: MaterializedState) -> Self {
        Self {
            seq,
            state,
            created_at: Utc::now(),
        }
    }

    /// Save the snapshot atomically with durable fsync.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let writer = BufWriter::new(file);
            let mut encoder = zstd::stream::Encoder::new(writer, COMPRESSION_LEVEL)?;
            serde_json::to_writer(&mut encoder, self)?;
            let mut writer = encoder.finish()?;
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| SnapshotError::Io(e.into_error()))?
                .sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load the snapshot if it exists.
    ///
    /// Returns `Ok(None)` if the file doesn't exist or is corrupt. Corrupt
    /// snapshots are moved to a `.bak` file so the daemon can recover via
    /// WAL replay from zero.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let result = zstd::stream::Decoder::new(BufReader::new(file))
            .map_err(SnapshotError::Io)
            .and_then(|decoder| serde_json::from_reader(decoder).map_err(SnapshotError::Json));

        match result {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                let bak_path = rotate_bak_path(path);
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "corrupt snapshot, moving to .bak and starting fresh",
                );
                fs::rename(path, &bak_path)?;
                Ok(None)
            }
        }
    }
}

/// Path for rotating a corrupt file out of the way.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".bak");
    PathBuf::from(p)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
