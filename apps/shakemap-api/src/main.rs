use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shakemap_api::admission::AdmissionQueue;
use shakemap_api::cache::ComputeCache;
use shakemap_api::config::Config;
use shakemap_api::engine::{HttpEngine, MemoryEngine, SeismicEngine};
use shakemap_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing; env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let engine: Arc<dyn SeismicEngine> = match &config.engine_url {
        Some(url) => {
            tracing::info!(engine_url = %url, "using remote overlay engine");
            Arc::new(HttpEngine::new(url, config.engine_timeout).expect("failed to build engine client"))
        }
        None => {
            tracing::warn!("ENGINE_URL not set; serving placeholder overlays for a sample event");
            Arc::new(MemoryEngine::with_sample_event())
        }
    };

    let queue = Arc::new(AdmissionQueue::new(config.admission));
    let cache = Arc::new(ComputeCache::new(engine, config.cache_ttl));

    tracing::info!(
        max_active = config.admission.max_active,
        heartbeat_timeout_secs = config.admission.heartbeat_timeout.as_secs(),
        promote_batch = config.admission.promote_batch,
        cache_ttl_secs = ?config.cache_ttl.map(|ttl| ttl.as_secs()),
        "shakemap-api configured"
    );

    if let Some(interval) = config.queue_sweep_interval {
        spawn_queue_sweeper(queue.clone(), interval);
    }

    let state = AppState {
        config: Arc::new(config),
        queue,
        cache,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(shakemap_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "shakemap-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

/// Evict silent sessions between requests. Requests still run their own
/// maintenance pass; this only tightens expiry on an idle server.
fn spawn_queue_sweeper(queue: Arc<AdmissionQueue>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let report = queue.sweep();
            if report.expired > 0 || report.promoted > 0 {
                tracing::debug!(expired = report.expired, promoted = report.promoted, "queue sweep");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
