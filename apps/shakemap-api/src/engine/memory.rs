use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use shakemap_common::EventMetadata;

use super::{EngineError, Overlay, SeismicEngine, SimulationParams};

// ---------------------------------------------------------------------------
// In-memory implementation (for local runs without an engine / tests)
// ---------------------------------------------------------------------------

/// Engine that reports a settable "latest" event and renders a placeholder
/// overlay for it.
pub struct MemoryEngine {
    event: RwLock<Option<EventMetadata>>,
    renders: AtomicUsize,
}

impl MemoryEngine {
    pub fn new(event: Option<EventMetadata>) -> Self {
        Self {
            event: RwLock::new(event),
            renders: AtomicUsize::new(0),
        }
    }

    /// Engine seeded with the 2025-03-28 Mandalay earthquake, so a server
    /// started without a real engine has something to render.
    pub fn with_sample_event() -> Self {
        let mut event = event_at("2025-03-28T06:20:52Z", 21.996, 95.926, 7.7, 10.0);
        event.insert("time_th", "2025-03-28 13:20:52");
        event.insert("place", "Mandalay, Myanmar");
        Self::new(Some(event))
    }

    pub fn set_event(&self, event: Option<EventMetadata>) {
        *self.event.write() = event;
    }
}

/// Build event metadata the way the engine reports it.
pub fn event_at(time_utc: &str, lat: f64, lon: f64, mag: f64, depth: f64) -> EventMetadata {
    let mut fields = Map::new();
    fields.insert("time_utc".into(), json!(time_utc));
    fields.insert("lat".into(), json!(lat));
    fields.insert("lon".into(), json!(lon));
    fields.insert("mag".into(), json!(mag));
    fields.insert("depth".into(), json!(depth));
    EventMetadata::new(fields)
}

/// Overlay `meta` for an event: the fingerprint fields under the names the
/// overlay renderer uses.
fn meta_for(event: &EventMetadata) -> Value {
    json!({
        "time_utc": event.get("time_utc"),
        "time_th": event.get("time_th"),
        "lat": event.get("lat"),
        "lon": event.get("lon"),
        "mag": event.get("mag"),
        "depth_km": event.depth(),
    })
}

#[async_trait]
impl SeismicEngine for MemoryEngine {
    async fn fetch_latest_event(&self) -> Result<Option<EventMetadata>, EngineError> {
        Ok(self.event.read().clone())
    }

    async fn compute_overlay(&self, event: &EventMetadata) -> Result<Overlay, EngineError> {
        let run = self.renders.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({
            "overlay": format!("render-{run}"),
            "meta": meta_for(event),
        }))
    }

    async fn simulate_event(&self, params: &SimulationParams) -> Result<Overlay, EngineError> {
        if params.mag <= 0.0 {
            return Err(EngineError::InvalidParameters(
                "magnitude must be positive".to_string(),
            ));
        }
        Ok(json!({
            "overlay": "simulated",
            "meta": {
                "simulated": true,
                "lat": params.lat,
                "lon": params.lon,
                "mag": params.mag,
                "depth_km": params.depth_km,
            },
        }))
    }
}
