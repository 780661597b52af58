mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

// ===========================================================================
// GET/POST /api/run
// ===========================================================================

#[tokio::test]
async fn run_computes_once_for_unchanged_event() {
    let (server, _, engine) = common::test_server(Some(common::mandalay()));

    let first = server.get("/api/run").await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["meta"]["mag"], 7.7);

    let second: Value = server.get("/api/run").await.json();
    assert_eq!(first, second);
    assert_eq!(engine.compute_calls(), 1);
}

#[tokio::test]
async fn run_recomputes_when_event_changes() {
    let (server, state, engine) = common::test_server(Some(common::mandalay()));

    server.post("/api/run").await.assert_status_ok();
    let f1 = state.cache.current_fingerprint().unwrap();

    engine.set_event(Some(common::aftershock()));
    let resp = server.post("/api/run").json(&json!({})).await;
    resp.assert_status_ok();
    let body: Value = resp.json();

    assert_eq!(body["meta"]["mag"], 5.5);
    assert_eq!(engine.compute_calls(), 2);
    let f2 = state.cache.current_fingerprint().unwrap();
    assert_ne!(f1, f2);
    assert_eq!(f2, common::aftershock().fingerprint().into_string());
}

#[tokio::test]
async fn run_with_force_always_recomputes() {
    let (server, _, engine) = common::test_server(Some(common::mandalay()));

    server.get("/api/run").await.assert_status_ok();
    for expected in 2..=3 {
        server
            .post("/api/run")
            .json(&json!({ "force": true }))
            .await
            .assert_status_ok();
        assert_eq!(engine.compute_calls(), expected);
    }
}

#[tokio::test]
async fn run_serves_cached_overlay_when_probe_fails() {
    let (server, _, engine) = common::test_server(Some(common::mandalay()));
    let cached: Value = server.get("/api/run").await.json();

    engine.set_fail_fetch(true);
    let resp = server.get("/api/run").await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<Value>(), cached);
    assert_eq!(engine.compute_calls(), 1);
}

#[tokio::test]
async fn run_reports_engine_failure_without_cache() {
    let (server, _, engine) = common::test_server(Some(common::mandalay()));
    engine.set_fail_compute(true);

    let resp = server.get("/api/run").await;
    resp.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "ENGINE_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("overlay rendering failed"));
}

#[tokio::test]
async fn run_without_any_event_is_an_engine_error() {
    let (server, _, _) = common::test_server(None);

    let resp = server.get("/api/run").await;
    resp.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = resp.json();
    assert_eq!(body["error"]["message"], "no recent event is available");
}

#[tokio::test]
async fn run_rejects_malformed_body() {
    let (server, _, engine) = common::test_server(Some(common::mandalay()));

    let resp = server.post("/api/run").text("{not json").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(engine.compute_calls(), 0);
}

#[tokio::test]
async fn run_in_simulate_mode_bypasses_cache() {
    let (server, state, engine) = common::test_server(Some(common::mandalay()));

    let resp = server
        .post("/api/run")
        .json(&json!({ "mode": "simulate", "lat": 18.79, "lon": 98.98, "depth": 10, "mag": 6.0 }))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["meta"]["simulated"], true);
    assert_eq!(body["meta"]["depth_km"], 10.0);

    assert_eq!(engine.simulate_calls(), 1);
    assert_eq!(engine.compute_calls(), 0);
    assert!(state.cache.entry().is_none());
}

// ===========================================================================
// POST /api/refresh + GET /api/cache_state
// ===========================================================================

#[tokio::test]
async fn refresh_recomputes_and_reports_event_key() {
    let (server, _, engine) = common::test_server(Some(common::mandalay()));
    server.get("/api/run").await.assert_status_ok();

    let resp = server.post("/api/refresh").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["meta"]["lat"], 21.996);
    assert_eq!(
        body["event_key"],
        common::mandalay().fingerprint().into_string()
    );
    assert_eq!(engine.compute_calls(), 2);
}

#[tokio::test]
async fn cache_state_tracks_first_computation() {
    let (server, _, _) = common::test_server(Some(common::mandalay()));

    let before: Value = server.get("/api/cache_state").await.json();
    assert_eq!(before["has_cache"], false);
    assert!(before["event_key"].is_null());
    assert!(before["ts"].is_null());
    assert!(before["ttl_sec"].is_null());

    server.get("/api/run").await.assert_status_ok();

    let after: Value = server.get("/api/cache_state").await.json();
    assert_eq!(after["has_cache"], true);
    assert_eq!(
        after["event_key"],
        common::mandalay().fingerprint().into_string()
    );
    assert!(after["ts"].is_string());
}

// ===========================================================================
// POST /api/simulate
// ===========================================================================

#[tokio::test]
async fn simulate_returns_overlay() {
    let (server, _, engine) = common::test_server(None);

    let resp = server
        .post("/api/simulate")
        .json(&json!({ "lat": 13.75, "lon": 100.5, "depth": 5.0, "mag": 5.8 }))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["meta"]["lat"], 13.75);
    assert_eq!(engine.simulate_calls(), 1);
}

#[tokio::test]
async fn simulate_validates_parameters() {
    let (server, _, engine) = common::test_server(None);

    let resp = server
        .post("/api/simulate")
        .json(&json!({ "lat": 120.0, "lon": 100.5, "depth": -3 }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["lat", "depth", "mag"]);
    assert_eq!(engine.simulate_calls(), 0);
}

#[tokio::test]
async fn simulate_surfaces_engine_rejection_as_bad_request() {
    let (server, _, engine) = common::test_server(None);

    let resp = server
        .post("/api/simulate")
        .json(&json!({ "lat": 13.75, "lon": 100.5, "depth": 5.0, "mag": 0.0 }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(engine.simulate_calls(), 1);
}
