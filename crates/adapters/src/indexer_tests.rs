// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_chain_scripts_head_and_existing() {
    let chain = FakeChainClient::new();
    chain.set_head(500);
    chain.set_existing([10, 20, 999]);

    assert_eq!(chain.chain_head("r", "c").await.unwrap(), 500);
    assert_eq!(
        chain.existing_blocks("r", "c", 0, 100).await.unwrap(),
        vec![10, 20]
    );
}

#[tokio::test]
async fn fake_chain_records_dispatch_order() {
    let chain = FakeChainClient::new();
    chain.process_batch("r", "c", 10, 2).await.unwrap();
    chain.process_single("r", "c", 20).await.unwrap();
    assert_eq!(chain.processed(), vec![(10, 2), (20, 1)]);
}

#[tokio::test]
async fn fake_stats_defaults_to_zero_timestamp() {
    let stats = FakeStatsRunner::new();
    assert_eq!(stats.stat_timestamp("c", "blocks", 2024, 5).await.unwrap(), 0);

    stats.set_timestamp("c", "blocks", 2024, 5, 777);
    assert_eq!(stats.stat_timestamp("c", "blocks", 2024, 5).await.unwrap(), 777);
}

#[tokio::test]
async fn fake_stats_records_computations() {
    let stats = FakeStatsRunner::new();
    stats.compute("assethub", "events", 2023, 12).await.unwrap();
    assert_eq!(
        stats.computed(),
        vec![("assethub".to_string(), "events".to_string(), 2023, 12)]
    );
}

#[test]
fn sidecar_urls_are_scoped_by_relay_and_chain() {
    let client = SidecarClient::new("http://localhost:8080");
    assert_eq!(
        client.url("polkadot", "assethub", "blocks/head"),
        "http://localhost:8080/polkadot/assethub/blocks/head"
    );
}
