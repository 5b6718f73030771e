// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource sampler: CPU / RSS / disk-IO from /proc.
//!
//! CPU is computed from two `/proc/<pid>/stat` readings 100ms apart; disk
//! throughput from two `/proc/<pid>/io` readings over the same window.
//! Missing fields degrade to zero with a warning. The sampler never fails
//! the outer activity.

use dix_core::ResourceSample;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Interval between the paired /proc readings.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct ResourceSampler {
    proc_root: PathBuf,
    /// Clock ticks per second (USER_HZ), queried at construction.
    tick_rate: u64,
}

impl ResourceSampler {
    pub fn new() -> Self {
        Self::with_root(Path::new("/proc"))
    }

    /// Sampler rooted at an alternate /proc (for tests).
    pub fn with_root(proc_root: &Path) -> Self {
        Self {
            proc_root: proc_root.to_owned(),
            tick_rate: query_tick_rate(),
        }
    }

    /// Sample the process. Missing /proc entries zero the affected fields.
    pub async fn sample(&self, pid: u32) -> ResourceSample {
        let cpu0 = self.read_cpu_ticks(pid);
        let io0 = self.read_io(pid);

        tokio::time::sleep(SAMPLE_INTERVAL).await;

        let cpu1 = self.read_cpu_ticks(pid);
        let io1 = self.read_io(pid);

        let interval_secs = SAMPLE_INTERVAL.as_secs_f64();
        let cpu_percent = match (cpu0, cpu1) {
            (Some(a), Some(b)) => {
                let delta = b.saturating_sub(a) as f64;
                delta / self.tick_rate as f64 / interval_secs * 100.0
            }
            _ => {
                warn!(pid, "cpu ticks unavailable, reporting 0");
                0.0
            }
        };

        let (disk_read_bytes_per_sec, disk_write_bytes_per_sec) = match (io0, io1) {
            (Some((r0, w0)), Some((r1, w1))) => (
                r1.saturating_sub(r0) as f64 / interval_secs,
                w1.saturating_sub(w0) as f64 / interval_secs,
            ),
            _ => {
                warn!(pid, "io counters unavailable, reporting 0");
                (0.0, 0.0)
            }
        };

        let memory_bytes = self.read_rss_bytes(pid).unwrap_or_else(|| {
            warn!(pid, "VmRSS unavailable, reporting 0");
            0
        });

        ResourceSample {
            cpu_percent,
            memory_bytes,
            disk_read_bytes_per_sec,
            disk_write_bytes_per_sec,
        }
    }

    /// Sum of utime + stime in clock ticks.
    fn read_cpu_ticks(&self, pid: u32) -> Option<u64> {
        let stat = std::fs::read_to_string(self.proc_root.join(pid.to_string()).join("stat")).ok()?;
        parse_stat_ticks(&stat)
    }

    fn read_rss_bytes(&self, pid: u32) -> Option<u64> {
        let status =
            std::fs::read_to_string(self.proc_root.join(pid.to_string()).join("status")).ok()?;
        parse_vmrss_bytes(&status)
    }

    fn read_io(&self, pid: u32) -> Option<(u64, u64)> {
        let io = std::fs::read_to_string(self.proc_root.join(pid.to_string()).join("io")).ok()?;
        parse_io_bytes(&io)
    }
}

impl Default for ResourceSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Actual USER_HZ rather than the common 100Hz assumption.
fn query_tick_rate() -> u64 {
    #[cfg(unix)]
    {
        if let Ok(Some(hz)) = nix::unistd::sysconf(nix::unistd::SysconfVar::CLK_TCK) {
            if hz > 0 {
                return hz as u64;
            }
        }
    }
    100
}

/// utime + stime from a /proc/<pid>/stat line.
///
/// The comm field (2) is parenthesized and may contain spaces, so fields
/// are counted from the closing paren: utime and stime are fields 14 and
/// 15, i.e. offsets 11 and 12 after the paren.
fn parse_stat_ticks(stat: &str) -> Option<u64> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}

/// `VmRSS: <n> kB` from /proc/<pid>/status, in bytes.
fn parse_vmrss_bytes(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

/// (read_bytes, write_bytes) from /proc/<pid>/io.
fn parse_io_bytes(io: &str) -> Option<(u64, u64)> {
    let mut read = None;
    let mut write = None;
    for line in io.lines() {
        if let Some(v) = line.strip_prefix("read_bytes:") {
            read = v.trim().parse().ok();
        } else if let Some(v) = line.strip_prefix("write_bytes:") {
            write = v.trim().parse().ok();
        }
    }
    Some((read?, write?))
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
