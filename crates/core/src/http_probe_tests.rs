// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn default_spec_accepts_any_2xx() {
    let spec = HttpProbeSpec::get("http://localhost:8080/health");
    assert!(spec.status_ok(200));
    assert!(spec.status_ok(204));
    assert!(!spec.status_ok(301));
    assert!(!spec.status_ok(500));
}

#[test]
fn exact_status_when_expected_set() {
    let spec = HttpProbeSpec::get("http://x/").expected_status(204);
    assert!(spec.status_ok(204));
    assert!(!spec.status_ok(200));
}

#[test]
fn walks_nested_objects() {
    let body = json!({"status": {"db": {"connected": true}}});
    let leaf = walk_json_path(&body, "status.db.connected").unwrap();
    assert!(json_leaf_healthy(leaf));
}

#[test]
fn missing_segment_returns_none() {
    let body = json!({"status": "ok"});
    assert!(walk_json_path(&body, "status.db").is_none());
    assert!(walk_json_path(&body, "nope").is_none());
}

#[yare::parameterized(
    bool_true    = { json!(true), true },
    bool_false   = { json!(false), false },
    str_healthy  = { json!("healthy"), true },
    str_ok       = { json!("ok"), true },
    str_up       = { json!("up"), true },
    str_ready    = { json!("ready"), true },
    str_true     = { json!("true"), true },
    str_other    = { json!("degraded"), false },
    num_positive = { json!(3), true },
    num_zero     = { json!(0), false },
    num_negative = { json!(-1), false },
    num_float    = { json!(0.5), true },
    null         = { json!(null), false },
    array        = { json!([1]), false },
    object       = { json!({"a": 1}), false },
)]
fn leaf_health_classification(value: serde_json::Value, expected: bool) {
    assert_eq!(json_leaf_healthy(&value), expected);
}
