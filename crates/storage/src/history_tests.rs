// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dix_core::{AlertType, HealthEvent, RestartEvent, Severity};
use tempfile::tempdir;

fn health(service: &str, at: u64, healthy: bool) -> HealthEvent {
    HealthEvent::new(at, service, "relay", healthy)
}

#[test]
fn records_and_queries_service_history() {
    let dir = tempdir().unwrap();
    let store = HistoryStore::open(dir.path()).unwrap();

    store.record_health(&health("polkadot", 1_000, true)).unwrap();
    store.record_health(&health("polkadot", 2_000, true)).unwrap();
    store.record_health(&health("kusama", 1_500, false)).unwrap();

    let rows = store.service_history("polkadot", 0, 10).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].timestamp_ms, 1_000);

    let limited = store.service_history("polkadot", 0, 1).unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].timestamp_ms, 2_000, "limit keeps newest");

    let since = store.service_history("polkadot", 1_500, 10).unwrap();
    assert_eq!(since.len(), 1);
}

#[test]
fn uptime_is_healthy_over_total() {
    let dir = tempdir().unwrap();
    let store = HistoryStore::open(dir.path()).unwrap();

    for (at, healthy) in [(1_000, true), (2_000, true), (3_000, false), (4_000, true)] {
        store.record_health(&health("svc", at, healthy)).unwrap();
    }

    let pct = store.uptime_percent("svc", 0, 10_000).unwrap();
    assert_eq!(pct, 75.0);
}

#[test]
fn uptime_of_empty_window_is_100() {
    let dir = tempdir().unwrap();
    let store = HistoryStore::open(dir.path()).unwrap();
    assert_eq!(store.uptime_percent("ghost", 0, 1).unwrap(), 100.0);
}

#[test]
fn downtime_incident_opens_and_resolves() {
    let dir = tempdir().unwrap();
    let store = HistoryStore::open(dir.path()).unwrap();

    store.record_health(&health("svc", 1_000, true)).unwrap();
    store.record_health(&health("svc", 5_000, false)).unwrap();
    assert_eq!(store.open_incidents().len(), 1);

    store.record_health(&health("svc", 65_000, true)).unwrap();
    assert!(store.open_incidents().is_empty());

    let stats = store.downtime_stats("svc", 0).unwrap();
    assert_eq!(stats.count, 1);
    assert_eq!(stats.total_secs, 60);
    assert_eq!(stats.max_secs, 60);
    assert_eq!(stats.mean_secs, 60.0);
}

#[test]
fn downtime_stats_aggregate_multiple_incidents() {
    let dir = tempdir().unwrap();
    let store = HistoryStore::open(dir.path()).unwrap();

    // 10s outage, then a 30s outage.
    store.record_health(&health("svc", 0, false)).unwrap();
    store.record_health(&health("svc", 10_000, true)).unwrap();
    store.record_health(&health("svc", 20_000, false)).unwrap();
    store.record_health(&health("svc", 50_000, true)).unwrap();

    let stats = store.downtime_stats("svc", 0).unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.total_secs, 40);
    assert_eq!(stats.max_secs, 30);
    assert_eq!(stats.mean_secs, 20.0);
}

#[test]
fn first_observation_unhealthy_opens_incident() {
    let dir = tempdir().unwrap();
    let store = HistoryStore::open(dir.path()).unwrap();
    store.record_health(&health("svc", 1_000, false)).unwrap();
    assert_eq!(store.open_incidents().len(), 1);
}

#[test]
fn restarts_and_alerts_are_appended() {
    let dir = tempdir().unwrap();
    let store = HistoryStore::open(dir.path()).unwrap();

    store
        .record_restart(&RestartEvent {
            timestamp_ms: 1_000,
            service: "svc".to_string(),
            reason: "unit inactive".to_string(),
            success: true,
        })
        .unwrap();
    store
        .record_alert(&dix_core::AlertRecord {
            timestamp_ms: 2_000,
            alert_type: AlertType::ServiceDown,
            severity: Severity::Critical,
            service: "svc".to_string(),
            message: "down".to_string(),
            resolved: false,
            resolved_at_ms: None,
        })
        .unwrap();

    assert!(dir.path().join("restarts.jsonl").exists());
    assert!(dir.path().join("alerts.jsonl").exists());
}

#[test]
fn purge_drops_old_rows_and_keeps_recent() {
    let dir = tempdir().unwrap();
    let store = HistoryStore::open(dir.path()).unwrap();

    store.record_health(&health("svc", 1_000, true)).unwrap();
    store.record_health(&health("svc", 2_000, true)).unwrap();
    store.record_health(&health("svc", 9_000, true)).unwrap();

    let dropped = store.purge_older_than(5_000).unwrap();
    assert_eq!(dropped, 2);

    let rows = store.service_history("svc", 0, 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].timestamp_ms, 9_000);
}
