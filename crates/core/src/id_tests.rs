// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_id! {
    /// Test-only ID type.
    pub struct TestId;
}

#[test]
fn new_and_as_str() {
    let id = TestId::new("abc123");
    assert_eq!(id.as_str(), "abc123");
    assert_eq!(id.to_string(), "abc123");
}

#[test]
fn short_truncates() {
    let id = TestId::new("abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

#[test]
fn str_short_id() {
    assert_eq!("hello".short(3), "hel");
    assert_eq!("hi".short(3), "hi");
}

#[test]
fn eq_with_str() {
    let id = TestId::new("x");
    assert_eq!(id, *"x");
    assert_eq!(id, "x");
}

#[test]
fn from_conversions() {
    let a: TestId = "a".into();
    let b: TestId = String::from("a").into();
    assert_eq!(a, b);
}
