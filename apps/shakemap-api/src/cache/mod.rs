//! Single-flight overlay cache keyed on the fingerprint of the latest event.
//!
//! Reads first run a cheap probe (fetch the latest event's metadata) without
//! holding the compute lock and only re-render the overlay when the event
//! fingerprint changed. Rendering always happens under the compute lock, so
//! at most one render is in flight; the stored entry is swapped in whole.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shakemap_common::{EventFingerprint, EventMetadata};
use tokio::sync::{Mutex, MutexGuard};

use crate::engine::{EngineError, Overlay, SeismicEngine, SimulationParams};

/// One computed overlay and the event it was computed from.
#[derive(Debug)]
pub struct CacheEntry {
    pub data: Overlay,
    pub fingerprint: EventFingerprint,
    pub computed_at: DateTime<Utc>,
    stored_at: Instant,
}

pub struct ComputeCache {
    engine: Arc<dyn SeismicEngine>,
    ttl: Option<Duration>,
    entry: RwLock<Option<Arc<CacheEntry>>>,
    compute_lock: Mutex<()>,
}

impl ComputeCache {
    pub fn new(engine: Arc<dyn SeismicEngine>, ttl: Option<Duration>) -> Self {
        Self {
            engine,
            ttl,
            entry: RwLock::new(None),
            compute_lock: Mutex::new(()),
        }
    }

    /// Return the overlay for the latest event.
    ///
    /// `force` always re-renders. Otherwise the cached entry is reused unless
    /// the probe reports a different event. Engine failures propagate only
    /// when there is nothing valid to serve.
    pub async fn get_or_compute(&self, force: bool) -> Result<Arc<CacheEntry>, EngineError> {
        if force {
            let held = self.compute_lock.lock().await;
            tracing::info!("forced overlay refresh");
            return self.compute_and_store(&held).await;
        }

        let Some(current) = self.usable_entry() else {
            let held = self.compute_lock.lock().await;
            // Someone may have filled the cache while we waited for the lock.
            if let Some(current) = self.usable_entry() {
                return Ok(current);
            }
            return self.compute_and_store(&held).await;
        };

        // Probe runs outside the compute lock.
        let event = match self.engine.fetch_latest_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!("staleness probe found no event; serving cached overlay");
                return Ok(current);
            }
            Err(err) => {
                tracing::debug!(%err, "staleness probe failed; serving cached overlay");
                return Ok(current);
            }
        };

        let candidate = event.fingerprint();
        if candidate == current.fingerprint {
            return Ok(current);
        }

        let _held = self.compute_lock.lock().await;
        if let Some(latest) = self.entry() {
            if latest.fingerprint == candidate {
                return Ok(latest);
            }
        }

        tracing::info!(previous = %current.fingerprint, latest = %candidate, "event changed; re-rendering overlay");
        match self.engine.compute_overlay(&event).await {
            Ok(data) => Ok(self.store(data, candidate)),
            Err(err) => {
                tracing::warn!(%err, "re-render failed; serving previous overlay");
                Ok(current)
            }
        }
    }

    /// Render a synthetic event. Never reads or writes the cache.
    pub async fn simulate(&self, params: &SimulationParams) -> Result<Overlay, EngineError> {
        self.engine.simulate_event(params).await
    }

    pub fn current_fingerprint(&self) -> Option<String> {
        self.entry().map(|e| e.fingerprint.to_string())
    }

    pub fn last_computed_at(&self) -> Option<DateTime<Utc>> {
        self.entry().map(|e| e.computed_at)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// The stored entry regardless of age.
    pub fn entry(&self) -> Option<Arc<CacheEntry>> {
        self.entry.read().clone()
    }

    /// The stored entry, unless it outlived the TTL.
    fn usable_entry(&self) -> Option<Arc<CacheEntry>> {
        let entry = self.entry()?;
        match self.ttl {
            Some(ttl) if entry.stored_at.elapsed() >= ttl => None,
            _ => Some(entry),
        }
    }

    /// Fetch the latest event, render it and store the result. Requires the
    /// compute lock.
    async fn compute_and_store(&self, _held: &MutexGuard<'_, ()>) -> Result<Arc<CacheEntry>, EngineError> {
        let event = self
            .engine
            .fetch_latest_event()
            .await?
            .ok_or(EngineError::NoEvent)?;
        let data = self.engine.compute_overlay(&event).await?;
        let fingerprint = match EventMetadata::from_overlay(&data) {
            Some(meta) => meta.fingerprint(),
            None => {
                tracing::warn!("overlay has no meta; fingerprinting the fetched event");
                event.fingerprint()
            }
        };
        Ok(self.store(data, fingerprint))
    }

    fn store(&self, data: Overlay, fingerprint: EventFingerprint) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry {
            data,
            fingerprint,
            computed_at: Utc::now(),
            stored_at: Instant::now(),
        });
        tracing::info!(fingerprint = %entry.fingerprint, "overlay cached");
        *self.entry.write() = Some(Arc::clone(&entry));
        entry
    }
}
