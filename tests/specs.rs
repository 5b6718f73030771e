//! End-to-end behavioral specifications for the dix supervisor.
//!
//! These tests drive the full engine in process — planner, runtime,
//! executor, fakes — through the same handle → apply → execute loop the
//! daemon runs, with a controllable clock.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/supervision.rs"]
mod supervision;

#[path = "specs/ordering.rs"]
mod ordering;

#[path = "specs/breaker.rs"]
mod breaker;

#[path = "specs/alerts.rs"]
mod alerts;

#[path = "specs/batch.rs"]
mod batch;
