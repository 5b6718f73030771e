// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

const STAT_LINE: &str = "1234 (some proc) S 1 1234 1234 0 -1 4194304 100 0 0 0 500 250 0 0 20 0 1 0 100 1000000 200 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0";

#[test]
fn parses_utime_plus_stime() {
    // utime=500, stime=250 (fields 14 and 15).
    assert_eq!(parse_stat_ticks(STAT_LINE), Some(750));
}

#[test]
fn stat_with_spaces_in_comm() {
    let line = "1 (tokio-runtime w) R 0 0 0 0 -1 0 0 0 0 0 10 20 0 0 20 0 1 0 0 0 0 0";
    assert_eq!(parse_stat_ticks(line), Some(30));
}

#[test]
fn malformed_stat_is_none() {
    assert_eq!(parse_stat_ticks("garbage"), None);
    assert_eq!(parse_stat_ticks("1 (x) S 2 3"), None);
}

#[test]
fn parses_vmrss_kb_to_bytes() {
    let status = "Name:\tnode\nVmPeak:\t  200 kB\nVmRSS:\t     1024 kB\n";
    assert_eq!(parse_vmrss_bytes(status), Some(1024 * 1024));
}

#[test]
fn missing_vmrss_is_none() {
    assert_eq!(parse_vmrss_bytes("Name: node\n"), None);
}

#[test]
fn parses_io_counters() {
    let io = "rchar: 100\nwchar: 50\nread_bytes: 4096\nwrite_bytes: 8192\n";
    assert_eq!(parse_io_bytes(io), Some((4096, 8192)));
}

#[tokio::test]
async fn sample_from_fake_proc_root() {
    let dir = tempdir().unwrap();
    let pid_dir = dir.path().join("42");
    std::fs::create_dir_all(&pid_dir).unwrap();
    std::fs::write(pid_dir.join("stat"), STAT_LINE).unwrap();
    std::fs::write(pid_dir.join("status"), "VmRSS:\t2048 kB\n").unwrap();
    std::fs::write(pid_dir.join("io"), "read_bytes: 1000\nwrite_bytes: 2000\n").unwrap();

    let sampler = ResourceSampler::with_root(dir.path());
    let sample = sampler.sample(42).await;

    // Static files: no delta, so rates and cpu are zero.
    assert_eq!(sample.cpu_percent, 0.0);
    assert_eq!(sample.memory_bytes, 2048 * 1024);
    assert_eq!(sample.disk_read_bytes_per_sec, 0.0);
    assert_eq!(sample.disk_write_bytes_per_sec, 0.0);
}

#[tokio::test]
async fn missing_pid_degrades_to_zero() {
    let dir = tempdir().unwrap();
    let sampler = ResourceSampler::with_root(dir.path());
    let sample = sampler.sample(999).await;
    assert_eq!(sample.cpu_percent, 0.0);
    assert_eq!(sample.memory_bytes, 0);
    assert_eq!(sample.disk_io_total(), 0.0);
}
