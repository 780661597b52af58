//! The overlay engine: the external service that knows how to find the
//! latest seismic event and render a shake-map overlay for it.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shakemap_common::EventMetadata;
use utoipa::ToSchema;

pub use http::HttpEngine;
pub use memory::MemoryEngine;

/// A rendered overlay document. Opaque to this service apart from its
/// `meta` sub-document.
pub type Overlay = Value;

/// Failures reported by an overlay engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine request failed: {0}")]
    Transport(String),

    #[error("engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("engine response could not be decoded: {0}")]
    Decode(String),

    #[error("no recent event is available")]
    NoEvent,

    #[error("invalid simulation parameters: {0}")]
    InvalidParameters(String),
}

/// Parameters of a synthetic event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SimulationParams {
    pub lat: f64,
    pub lon: f64,
    pub depth_km: f64,
    pub mag: f64,
}

/// Abstraction over the overlay engine.
///
/// Backed by a remote HTTP service in production and scripted in-process
/// engines in tests.
#[async_trait]
pub trait SeismicEngine: Send + Sync {
    /// Metadata of the most recent qualifying event, or `None` if there is none.
    async fn fetch_latest_event(&self) -> Result<Option<EventMetadata>, EngineError>;

    /// Render the full overlay for an event. The result carries a `meta`
    /// sub-document describing the event.
    async fn compute_overlay(&self, event: &EventMetadata) -> Result<Overlay, EngineError>;

    /// Render an overlay for a synthetic event.
    async fn simulate_event(&self, params: &SimulationParams) -> Result<Overlay, EngineError>;
}
