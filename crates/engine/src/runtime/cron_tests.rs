// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn boundary_wait_is_period_minus_remainder() {
    // 2023-11-14T22:13:20Z → 800s past the hour.
    let now_ms = 1_700_000_000_000u64;
    let wait = until_next_boundary(now_ms, HOUR_MS);
    assert_eq!(wait, Duration::from_millis(HOUR_MS - (now_ms % HOUR_MS)));
    assert!(wait <= Duration::from_millis(HOUR_MS));
}

#[test]
fn boundary_wait_never_goes_hot() {
    // Exactly on the boundary: wait a full period, not zero.
    let wait = until_next_boundary(3_600_000, HOUR_MS);
    assert_eq!(wait, Duration::from_millis(HOUR_MS));

    // Just shy of the boundary: the remainder is clamped up to a second.
    let wait = until_next_boundary(7_199_500, HOUR_MS);
    assert_eq!(wait, Duration::from_secs(1));
}

#[test]
fn year_month_from_epoch() {
    // 2023-11-14T22:13:20Z
    assert_eq!(year_month(1_700_000_000_000), Some((2023, 11)));
}

#[yare::parameterized(
    mid_year  = { 2024, 6, (2024, 5) },
    january   = { 2024, 1, (2023, 12) },
)]
fn previous_month_wraps(year: i32, month: u32, expected: (i32, u32)) {
    assert_eq!(previous_month(year, month), expected);
}
