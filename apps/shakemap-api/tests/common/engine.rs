use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shakemap_common::EventMetadata;

use shakemap_api::engine::{EngineError, MemoryEngine, Overlay, SeismicEngine, SimulationParams};

/// In-memory engine with call counters, an optional render delay and
/// injectable failures, so tests can check exactly how often the expensive
/// paths ran.
pub struct ScriptedEngine {
    inner: MemoryEngine,
    compute_delay: Mutex<Duration>,
    fail_fetch: AtomicBool,
    fail_compute: AtomicBool,
    omit_meta: AtomicBool,
    fetch_calls: AtomicUsize,
    compute_calls: AtomicUsize,
    simulate_calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(event: Option<EventMetadata>) -> Self {
        Self {
            inner: MemoryEngine::new(event),
            compute_delay: Mutex::new(Duration::ZERO),
            fail_fetch: AtomicBool::new(false),
            fail_compute: AtomicBool::new(false),
            omit_meta: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            compute_calls: AtomicUsize::new(0),
            simulate_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_event(&self, event: Option<EventMetadata>) {
        self.inner.set_event(event);
    }

    pub fn set_compute_delay(&self, delay: Duration) {
        *self.compute_delay.lock() = delay;
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_compute(&self, fail: bool) {
        self.fail_compute.store(fail, Ordering::SeqCst);
    }

    /// Render overlays without a `meta` sub-document.
    pub fn set_omit_meta(&self, omit: bool) {
        self.omit_meta.store(omit, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn compute_calls(&self) -> usize {
        self.compute_calls.load(Ordering::SeqCst)
    }

    pub fn simulate_calls(&self) -> usize {
        self.simulate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeismicEngine for ScriptedEngine {
    async fn fetch_latest_event(&self) -> Result<Option<EventMetadata>, EngineError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(EngineError::Transport("event feed unreachable".to_string()));
        }
        self.inner.fetch_latest_event().await
    }

    async fn compute_overlay(&self, event: &EventMetadata) -> Result<Overlay, EngineError> {
        self.compute_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.compute_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_compute.load(Ordering::SeqCst) {
            return Err(EngineError::Status {
                status: 500,
                body: "overlay rendering failed".to_string(),
            });
        }
        let mut overlay = self.inner.compute_overlay(event).await?;
        if self.omit_meta.load(Ordering::SeqCst) {
            if let Some(fields) = overlay.as_object_mut() {
                fields.remove("meta");
            }
        }
        Ok(overlay)
    }

    async fn simulate_event(&self, params: &SimulationParams) -> Result<Overlay, EngineError> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.simulate_event(params).await
    }
}
