//! Batch block-indexing orchestration.

use crate::prelude::*;
use dix_core::{BatchRunId, Event};

fn batch_config(batch_size: u32, max_workers: u32) -> dix_plan::FleetConfig {
    let mut config = single_relay_config();
    config.batch.batch_size = batch_size;
    config.batch.max_workers = max_workers;
    config
}

async fn run_batch(fleet: &mut Fleet, start: i64, end: i64) -> BatchRunId {
    let run = BatchRunId::new("spec-run");
    fleet
        .send(Event::BatchRequested {
            run: run.clone(),
            relay: "polkadot".to_string(),
            chain: "assethub".to_string(),
            start_range: start,
            end_range: end,
        })
        .await;
    run
}

/// Missing IDs [10, 11, 12, 14, 15, 20] with batch_size=2 partition into
/// [10,11], [12], [14,15], [20]: two batch calls and two single calls,
/// dispatched left to right.
#[tokio::test]
async fn continuous_batches_partition_and_dispatch_in_order() {
    let mut fleet = Fleet::new(&batch_config(2, 4));
    let missing = [10u64, 11, 12, 14, 15, 20];
    fleet.chain.set_head(20);
    fleet
        .chain
        .set_existing((0..=20).filter(|id| !missing.contains(id)));

    let run = run_batch(&mut fleet, 0, -1).await;

    assert_eq!(
        fleet.chain.processed(),
        vec![(10, 2), (12, 1), (14, 2), (20, 1)]
    );
    assert!(fleet.state.lock().batch_runs[&run].finished);
}

/// batch_size=1 forces every batch through the single-block path.
#[tokio::test]
async fn batch_size_one_means_all_singles() {
    let mut fleet = Fleet::new(&batch_config(1, 4));
    fleet.chain.set_head(4);
    fleet.chain.set_existing([1u64, 3]);

    run_batch(&mut fleet, 0, -1).await;

    assert_eq!(fleet.chain.processed(), vec![(0, 1), (2, 1), (4, 1)]);
}

/// An explicit end range skips the chain-head activity.
#[tokio::test]
async fn explicit_range_does_not_consult_the_head() {
    let mut fleet = Fleet::new(&batch_config(10, 4));
    // Head says 5, but the request pins [0, 8].
    fleet.chain.set_head(5);
    fleet.chain.set_existing([0u64, 1, 2, 3]);

    run_batch(&mut fleet, 0, 8).await;

    assert_eq!(fleet.chain.processed(), vec![(4, 5)]);
}

/// An empty missing set finishes without dispatching anything.
#[tokio::test]
async fn fully_indexed_range_finishes_immediately() {
    let mut fleet = Fleet::new(&batch_config(10, 4));
    fleet.chain.set_head(10);
    fleet.chain.set_existing(0..=10);

    let run = run_batch(&mut fleet, 0, -1).await;

    assert!(fleet.chain.processed().is_empty());
    assert!(fleet.state.lock().batch_runs[&run].finished);
}
