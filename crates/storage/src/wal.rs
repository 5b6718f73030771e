// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL event write-ahead log with group commit support.
//!
//! Events are durably stored before processing, enabling crash recovery
//! via snapshot + replay. Group commit batches writes (~10ms) for performance.
//!
//! Each entry is a single line of JSON: `{"seq":N,"event":{...}}\n`

use dix_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// Flush interval for group commit (~10ms batches)
const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Maximum entries to buffer before forcing flush
const FLUSH_THRESHOLD: usize = 100;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialization helper for writing WAL entries without cloning the event.
#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    event: &'a Event,
}

#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    event: Event,
}

/// A single WAL entry with sequence number
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// JSONL WAL for durable event storage with group commit.
///
/// Events are buffered in memory and flushed to disk either when
/// `needs_flush()` reports the interval elapsed / buffer full, or
/// explicitly via `flush()`.
///
/// The WAL tracks both the write sequence (highest seq written) and the
/// processed sequence (highest seq the engine has handled). The processed
/// sequence is persisted via snapshots, not here.
pub struct Wal {
    file: File,
    /// Persistent read handle for next_unprocessed
    read_file: File,
    path: PathBuf,
    write_seq: u64,
    processed_seq: u64,
    /// Buffered JSON lines waiting to be flushed (without trailing newline)
    write_buffer: Vec<Vec<u8>>,
    last_flush: Instant,
    /// Current read position for next_unprocessed
    read_offset: u64,
}

impl Wal {
    /// Open or create a WAL at the given path.
    ///
    /// `processed_seq` should come from the snapshot (or 0 without one).
    /// A corrupt tail (partial write from a crash) is dropped with a warning;
    /// entries before the corruption are preserved.
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let scan = Self::scan(&file, processed_seq)?;
        let file = if scan.corrupt {
            warn!(
                path = %path.display(),
                valid_entries = scan.valid_lines.len(),
                "corrupt WAL tail detected, rewriting with valid entries only",
            );
            drop(file);
            Self::rewrite(path, &scan.valid_lines)?
        } else {
            file
        };

        let read_file = file.try_clone()?;

        Ok(Self {
            file,
            read_file,
            path: path.to_owned(),
            write_seq: scan.max_seq,
            processed_seq,
            write_buffer: Vec::new(),
            last_flush: Instant::now(),
            read_offset: scan.read_offset,
        })
    }

    /// Append an event to the write buffer.
    ///
    /// Returns the assigned sequence number. The event is NOT durable until
    /// `flush()` is called.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        self.write_seq += 1;
        let seq = self.write_seq;
        let record = WalRecordRef { seq, event };
        self.write_buffer.push(serde_json::to_vec(&record)?);
        Ok(seq)
    }

    /// Check if flush is needed (interval elapsed or buffer full).
    pub fn needs_flush(&self) -> bool {
        !self.write_buffer.is_empty()
            && (self.last_flush.elapsed() >= FLUSH_INTERVAL
                || self.write_buffer.len() >= FLUSH_THRESHOLD)
    }

    /// Flush all buffered entries to disk with a single fsync.
    ///
    /// This is the durability point: after flush returns, all buffered
    /// events are on disk.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }

        for mut json_bytes in self.write_buffer.drain(..) {
            json_bytes.push(b'\n');
            self.file.write_all(&json_bytes)?;
        }

        self.file.sync_all()?;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Get the next unprocessed entry from the WAL.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
        // Flush pending writes so they're readable
        self.flush()?;

        let mut reader = BufReader::new(&self.read_file);
        reader.seek(SeekFrom::Start(self.read_offset))?;

        let mut line = String::new();
        let bytes_read = match reader.read_line(&mut line) {
            Ok(0) => return Ok(None),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            self.read_offset += bytes_read as u64;
            return Ok(None);
        }

        let record: WalRecord = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                warn!(offset = self.read_offset, error = %e, "corrupt WAL entry, skipping");
                self.read_offset += bytes_read as u64;
                return Ok(None);
            }
        };

        self.read_offset += bytes_read as u64;

        Ok(Some(WalEntry {
            seq: record.seq,
            event: record.event,
        }))
    }

    /// Mark an entry as processed (in-memory; persisted via snapshots).
    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = seq;
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Truncate entries at or before the given sequence number.
    ///
    /// Called after a checkpoint to reclaim disk space. The snapshot must be
    /// durable before this runs.
    pub fn truncate_through(&mut self, seq: u64) -> Result<(), WalError> {
        self.flush()?;

        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut kept: Vec<String> = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => break,
            };
            if record.seq > seq {
                kept.push(trimmed.to_string());
            }
        }

        let file = Self::rewrite(&self.path, &kept)?;
        self.read_file = file.try_clone()?;
        self.file = file;
        // Everything remaining is unprocessed; restart reads from the top.
        self.read_offset = 0;
        Ok(())
    }

    /// Scan the WAL: find max seq, the read offset for `processed_seq`, and
    /// collect valid lines in case the tail is corrupt.
    fn scan(file: &File, processed_seq: u64) -> Result<ScanResult, WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut result = ScanResult {
            max_seq: 0,
            read_offset: 0,
            corrupt: false,
            valid_lines: Vec::new(),
        };
        let mut current_offset = 0u64;
        let mut found_unprocessed = false;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    result.corrupt = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                current_offset += bytes_read as u64;
                continue;
            }

            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => {
                    result.corrupt = true;
                    break;
                }
            };

            result.max_seq = result.max_seq.max(record.seq);
            if record.seq > processed_seq && !found_unprocessed {
                result.read_offset = current_offset;
                found_unprocessed = true;
            }

            result.valid_lines.push(trimmed.to_string());
            current_offset += bytes_read as u64;
        }

        if !found_unprocessed {
            result.read_offset = current_offset;
        }

        Ok(result)
    }

    /// Atomically replace the WAL file with the given lines.
    fn rewrite(path: &Path, lines: &[String]) -> Result<File, WalError> {
        let tmp_path = path.with_extension("tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for l in lines {
                tmp.write_all(l.as_bytes())?;
                tmp.write_all(b"\n")?;
            }
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(WalError::Io)
    }
}

struct ScanResult {
    max_seq: u64,
    read_offset: u64,
    corrupt: bool,
    valid_lines: Vec<String>,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
