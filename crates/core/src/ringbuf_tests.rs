// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn push_below_capacity_keeps_all() {
    let mut rb = RingBuffer::new(5);
    rb.push("a");
    rb.push("b");
    assert_eq!(rb.get_lines(10), vec!["a", "b"]);
}

#[test]
fn wraps_and_evicts_oldest() {
    let mut rb = RingBuffer::new(3);
    for s in ["a", "b", "c", "d", "e"] {
        rb.push(s);
    }
    assert_eq!(rb.get_lines(3), vec!["c", "d", "e"]);
}

#[test]
fn get_fewer_than_stored() {
    let mut rb = RingBuffer::new(4);
    for s in ["1", "2", "3", "4"] {
        rb.push(s);
    }
    assert_eq!(rb.get_lines(2), vec!["3", "4"]);
}

#[test]
fn empty_buffer_returns_nothing() {
    let rb = RingBuffer::new(3);
    assert!(rb.get_lines(5).is_empty());
    assert!(rb.is_empty());
}

#[test]
fn capacity_one() {
    let mut rb = RingBuffer::new(1);
    rb.push("x");
    rb.push("y");
    assert_eq!(rb.get_lines(1), vec!["y"]);
}

proptest! {
    /// After inserting M >= N lines into a buffer of capacity N, GetLines(N)
    /// returns the last N in insertion order.
    #[test]
    fn last_n_in_insertion_order(cap in 1usize..50, extra in 0usize..100) {
        let total = cap + extra;
        let mut rb = RingBuffer::new(cap);
        for i in 0..total {
            rb.push(format!("line-{i}"));
        }
        let lines = rb.get_lines(cap);
        let expected: Vec<String> = (total - cap..total).map(|i| format!("line-{i}")).collect();
        prop_assert_eq!(lines, expected);
    }
}
