pub mod admission;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod routes;

use std::sync::Arc;

use admission::AdmissionQueue;
use cache::ComputeCache;
use config::Config;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub queue: Arc<AdmissionQueue>,
    pub cache: Arc<ComputeCache>,
}
