// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fingerprint_is_type_service_severity() {
    let a = Alert::new(AlertType::HighCpu, Severity::Warning, "polkadot", "cpu at 85%", 1000);
    assert_eq!(a.fingerprint(), "high_cpu|polkadot|warning");
}

#[test]
fn same_fingerprint_for_different_messages() {
    let a = Alert::new(AlertType::ServiceDown, Severity::Critical, "svc", "down", 1);
    let b = Alert::new(AlertType::ServiceDown, Severity::Critical, "svc", "still down", 99);
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn severity_orders() {
    assert!(Severity::Info < Severity::Warning);
    assert!(Severity::Warning < Severity::Critical);
}

#[test]
fn alert_type_serializes_snake_case() {
    let json = serde_json::to_string(&AlertType::HealthCheckFailed).unwrap();
    assert_eq!(json, "\"health_check_failed\"");
}

#[test]
fn alert_round_trips_through_json() {
    let mut a = Alert::new(AlertType::RestartLoop, Severity::Warning, "dixfe", "3 restarts", 42);
    a.labels.insert("chain".into(), "assethub".into());
    let json = serde_json::to_string(&a).unwrap();
    let back: Alert = serde_json::from_str(&json).unwrap();
    assert_eq!(a, back);
}
