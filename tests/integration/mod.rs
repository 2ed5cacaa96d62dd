//! Integration tests for the Manifold momentum bot.
//!
//! Most tests drive the full snapshot and momentum flows against the mock
//! client and file-backed collections. Tests marked `#[ignore]` hit the real
//! Manifold API.
//! Run with: cargo test --test integration -- --ignored

use manifold_momentum::collector::save_markets;
use manifold_momentum::config::Config;
use manifold_momentum::market::{
    FetchConfig, ManifoldClient, MarketApi, MarketFilter, MockConfig, MockManifoldClient,
    SearchParams,
};
use manifold_momentum::store::Collection;
use manifold_momentum::strategy::{run_momentum, MomentumParams};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashSet;
use tempfile::TempDir;

fn market(id: &str, probability: f64) -> Value {
    json!({
        "id": id,
        "question": format!("Will {} happen?", id),
        "probability": probability,
        "totalLiquidity": 1000,
        "isResolved": false,
        "token": "MANA",
        "closeTime": 4_102_444_800_000_i64,
        "creatorUsername": "someone",
    })
}

fn fetch_config() -> FetchConfig {
    FetchConfig {
        total: 4,
        page_size: 2,
        filter: MarketFilter::default(),
    }
}

#[tokio::test]
async fn snapshot_then_momentum_bets_once() {
    let dir = TempDir::new().unwrap();
    let markets_path = dir.path().join("markets_db.json");
    let bets_path = dir.path().join("bets_db.json");
    let client = MockManifoldClient::new();

    // First run records the prior probabilities.
    client.set_markets(vec![
        market("rising", 0.90),
        market("steady", 0.50),
        market("already-high", 0.96),
    ]);
    let mut markets = Collection::open(&markets_path).unwrap();
    let saved = save_markets(&client, &mut markets, &fetch_config()).await.unwrap();
    assert_eq!(saved.fetched, 3);
    assert_eq!(saved.reconciled.unwrap().counts(), (3, 0));

    // Probabilities move; the momentum run sees the stored snapshot.
    client.set_markets(vec![
        market("rising", 0.96),
        market("steady", 0.55),
        market("already-high", 0.96),
    ]);
    let snapshot = Collection::open(&markets_path).unwrap();
    assert_eq!(snapshot.len(), 3);
    let mut bets = Collection::open(&bets_path).unwrap();

    let summary = run_momentum(
        &client,
        &snapshot,
        &mut bets,
        &fetch_config(),
        &MomentumParams::default(),
    )
    .await
    .unwrap();

    assert_eq!(summary.report.fetched, 3);
    assert_eq!(summary.report.tracked, 3);
    assert_eq!(summary.report.prior_below, 2);
    assert_eq!(summary.report.in_band, 1);
    assert_eq!(summary.bets.placed, 1);
    assert_eq!(client.bet_calls()[0].contract_id, "rising");

    // The bet survives a reload and blocks a second bet on the same market.
    let mut bets = Collection::open(&bets_path).unwrap();
    assert_eq!(bets.len(), 1);
    assert!(bets.contains("contractId", &json!("rising")));

    let again = run_momentum(
        &client,
        &snapshot,
        &mut bets,
        &fetch_config(),
        &MomentumParams::default(),
    )
    .await
    .unwrap();
    assert_eq!(again.report.not_bet_on, 0);
    assert_eq!(again.already_bet, 1);
    assert_eq!(client.bet_calls().len(), 1);
}

#[tokio::test]
async fn snapshot_updates_changed_markets_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("persistence").join("markets_db.json");
    let client = MockManifoldClient::new();

    client.set_markets(vec![market("a", 0.3), market("b", 0.4)]);
    let mut markets = Collection::open(&path).unwrap();
    save_markets(&client, &mut markets, &fetch_config()).await.unwrap();

    client.set_markets(vec![market("a", 0.3), market("b", 0.45), market("c", 0.1)]);
    let mut markets = Collection::open(&path).unwrap();
    let summary = save_markets(&client, &mut markets, &fetch_config())
        .await
        .unwrap()
        .reconciled
        .unwrap();
    assert_eq!(summary.counts(), (1, 1));
    assert_eq!(summary.unchanged, 1);

    let reloaded = Collection::open(&path).unwrap();
    assert_eq!(reloaded.len(), 3);
    let id = json!("b");
    let b: Vec<_> = reloaded.search("id", &id).map(|(_, doc)| doc).collect();
    assert_eq!(b.len(), 1);
    assert_eq!(b[0]["probability"], json!(0.45));

    // Stored documents keep only the projected fields.
    assert!(b[0].get("creatorUsername").is_none());
    assert!(b[0].get("closeTime").is_some());
}

#[tokio::test]
async fn failed_page_does_not_abort_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("markets_db.json");
    let client = MockManifoldClient::with_config(MockConfig {
        failing_offsets: HashSet::from([0]),
        ..MockConfig::default()
    });
    client.set_markets(vec![
        market("first-page-1", 0.2),
        market("first-page-2", 0.2),
        market("second-page", 0.2),
    ]);

    let mut markets = Collection::open(&path).unwrap();
    let saved = save_markets(&client, &mut markets, &fetch_config()).await.unwrap();

    assert_eq!(saved.fetched, 1);
    assert_eq!(client.searches().len(), 2);
    let reloaded = Collection::open(&path).unwrap();
    assert!(reloaded.contains("id", &json!("second-page")));
}

#[tokio::test]
async fn bet_cap_includes_history_on_disk() {
    let dir = TempDir::new().unwrap();
    let bets_path = dir.path().join("bets_db.json");
    let client = MockManifoldClient::new();

    let mut snapshot = Collection::in_memory();
    let mut current = Vec::new();
    for i in 0..4 {
        let id = format!("m{}", i);
        snapshot
            .insert(json!({"id": id, "probability": 0.9}).as_object().unwrap().clone())
            .unwrap();
        current.push(market(&id, 0.96));
    }
    client.set_markets(current);

    let mut bets = Collection::open(&bets_path).unwrap();
    bets.insert(json!({"contractId": "old-1"}).as_object().unwrap().clone())
        .unwrap();
    bets.insert(json!({"contractId": "old-2"}).as_object().unwrap().clone())
        .unwrap();

    let params = MomentumParams {
        max_total_bets: 3,
        ..MomentumParams::default()
    };
    let fetch = FetchConfig {
        total: 4,
        page_size: 4,
        filter: MarketFilter::default(),
    };
    let summary = run_momentum(&client, &snapshot, &mut bets, &fetch, &params)
        .await
        .unwrap();

    assert_eq!(summary.report.not_bet_on, 4);
    assert_eq!(summary.bets.placed, 1);
    assert!(summary.bets.cap_reached);
    assert_eq!(Collection::open(&bets_path).unwrap().len(), 3);
}

/// Live search against the public API. No credentials needed.
#[tokio::test]
#[ignore = "requires network access"]
async fn test_search_markets_live() {
    let client = ManifoldClient::new(&Config::default()).unwrap();

    let result = client.search_markets(&SearchParams::page(5, 0)).await;
    assert!(result.is_ok(), "Search failed: {:?}", result.err());

    let markets = result.unwrap();
    println!("Fetched {} markets", markets.len());
    for m in &markets {
        println!("  {} {:?}", m["id"], m.get("probability"));
    }
}
