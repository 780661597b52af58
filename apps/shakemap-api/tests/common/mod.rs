#![allow(dead_code)]

pub mod engine;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_test::TestServer;
use shakemap_common::EventMetadata;

use shakemap_api::admission::{AdmissionConfig, AdmissionQueue};
use shakemap_api::cache::ComputeCache;
use shakemap_api::config::Config;
use shakemap_api::engine::memory::event_at;
use shakemap_api::AppState;

pub use engine::ScriptedEngine;

/// Build a test AppState over a scripted in-memory engine. The engine handle is
/// returned so tests can change the reported event and count renders.
pub fn test_state(admission: AdmissionConfig, event: Option<EventMetadata>) -> (AppState, Arc<ScriptedEngine>) {
    let config = Config {
        engine_url: None,
        engine_timeout: Duration::from_secs(5),
        port: 0,
        admission,
        queue_sweep_interval: None,
        cache_ttl: None,
    };

    let engine = Arc::new(ScriptedEngine::new(event));
    let state = AppState {
        queue: Arc::new(AdmissionQueue::new(config.admission)),
        cache: Arc::new(ComputeCache::new(engine.clone(), config.cache_ttl)),
        config: Arc::new(config),
    };

    (state, engine)
}

/// Build the full application router wired to a test state.
pub fn test_app(admission: AdmissionConfig, event: Option<EventMetadata>) -> (Router, AppState, Arc<ScriptedEngine>) {
    let (state, engine) = test_state(admission, event);
    let app = shakemap_api::routes::router().with_state(state.clone());
    (app, state, engine)
}

/// Test server with default queue limits and `event` as the latest event.
pub fn test_server(event: Option<EventMetadata>) -> (TestServer, AppState, Arc<ScriptedEngine>) {
    let (app, state, engine) = test_app(AdmissionConfig::default(), event);
    (TestServer::new(app).unwrap(), state, engine)
}

/// Test server whose queue admits at most `max_active` sessions.
pub fn queue_server(max_active: usize) -> TestServer {
    let admission = AdmissionConfig {
        max_active,
        ..AdmissionConfig::default()
    };
    let (app, _, _) = test_app(admission, None);
    TestServer::new(app).unwrap()
}

/// The 2025-03-28 Mandalay earthquake as the engine would report it.
pub fn mandalay() -> EventMetadata {
    event_at("2025-03-28T06:20:52Z", 21.996, 95.926, 7.7, 10.0)
}

/// A later, smaller aftershock.
pub fn aftershock() -> EventMetadata {
    event_at("2025-04-13T02:54:52Z", 20.880, 96.100, 5.5, 10.0)
}
