//! Integration tests for the REST surface (spec.md §4.8 / §6), exercised end to end through
//! `warp::test` against the real route tree, with a `wiremock` stand-in beacon node underneath
//! so `GET /eth/v1/node/health` resolves without a live network.

use duty_watcher::duties::{DutyType, ValidatorDuty};
use duty_watcher::duty_store::DutyStore;
use duty_watcher::identifiers::registry::IdentifierRegistry;
use duty_watcher::node_pool::BeaconNodePool;
use duty_watcher::rest::{routes, RestState};
use duty_watcher::slot_clock::SlotClock;
use eth2::BeaconNodeHttpClient;
use sensitive_url::SensitiveUrl;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn healthy_state() -> (MockServer, RestState) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eth/v1/node/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = BeaconNodeHttpClient::new(
        SensitiveUrl::parse(&server.uri()).unwrap(),
        Duration::from_secs(1),
    )
    .unwrap();
    let log = logging::test_logger();
    let beacon_pool = Arc::new(BeaconNodePool::new(vec![client], log.clone()));

    let state = RestState {
        duty_store: Arc::new(DutyStore::default()),
        registry: Arc::new(IdentifierRegistry::default()),
        beacon_pool,
        clock: SlotClock::new(0),
        log,
    };
    (server, state)
}

fn attestation_duty(slot: u64) -> ValidatorDuty {
    ValidatorDuty {
        pubkey: format!("0x{}", "aa".repeat(48)),
        validator_index: 1,
        duty_type: DutyType::Attestation,
        epoch: 0,
        slot,
        validator_sync_committee_indices: vec![],
    }
}

#[tokio::test]
async fn duties_raw_returns_the_matching_table() {
    let (_server, state) = healthy_state().await;
    state.duty_store.set(vec![attestation_duty(1_000_000)]);
    let filter = routes(state);

    let resp = warp::test::request()
        .method("GET")
        .path("/duties/raw/attestation")
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), 200);
    let body: Vec<serde_json::Value> = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["validator_index"], 1);
}

#[tokio::test]
async fn duties_raw_unknown_kind_is_not_found() {
    let (_server, state) = healthy_state().await;
    let filter = routes(state);

    let resp = warp::test::request()
        .method("GET")
        .path("/duties/raw/not-a-real-kind")
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn duties_any_reflects_store_and_connectivity() {
    let (_server, state) = healthy_state().await;
    let filter = routes(state.clone());

    let resp = warp::test::request()
        .method("GET")
        .path("/duties/any")
        .reply(&filter)
        .await;

    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["any"], false);

    state.duty_store.set(vec![attestation_duty(1_000_000)]);
    let filter = routes(state);
    let resp = warp::test::request()
        .method("GET")
        .path("/duties/any")
        .reply(&filter)
        .await;
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["any"], true);
}

#[tokio::test]
async fn add_identifier_rejects_all_malformed_input() {
    let (_server, state) = healthy_state().await;
    let filter = routes(state);

    let resp = warp::test::request()
        .method("POST")
        .path("/validator/identifier")
        .json(&vec!["0xnotahexkey".to_string()])
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn remove_identifier_with_no_matches_still_returns_ok_for_well_formed_tokens() {
    let (_server, state) = healthy_state().await;
    let filter = routes(state);

    let resp = warp::test::request()
        .method("DELETE")
        .path("/validator/identifier")
        .json(&vec!["42".to_string()])
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), 200);
    let body: Vec<serde_json::Value> = serde_json::from_slice(resp.body()).unwrap();
    assert!(body.is_empty());
}
