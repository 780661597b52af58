use std::time::Duration;

use crate::admission::AdmissionConfig;

/// ShakeMap API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the overlay engine (e.g. `http://localhost:9000`). When
    /// unset the server runs against the built-in in-memory engine.
    pub engine_url: Option<String>,
    /// Timeout applied to every engine HTTP call.
    pub engine_timeout: Duration,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Admission queue limits.
    pub admission: AdmissionConfig,
    /// When set, a background task sweeps expired sessions at this interval.
    pub queue_sweep_interval: Option<Duration>,
    /// Maximum age of a cached overlay. `None` keeps it until the event changes.
    pub cache_ttl: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables. Every variable is
    /// optional; unparseable or out-of-range values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
        let positive = |name: &str| parsed(name).filter(|n| *n > 0);
        let defaults = AdmissionConfig::default();

        Self {
            engine_url: lookup("ENGINE_URL").filter(|s| !s.is_empty()),
            engine_timeout: Duration::from_secs(parsed("ENGINE_TIMEOUT_SECS").unwrap_or(120)),
            port: lookup("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(8000),
            admission: AdmissionConfig {
                max_active: positive("QUEUE_MAX_ACTIVE")
                    .map(|n| n as usize)
                    .unwrap_or(defaults.max_active),
                heartbeat_timeout: parsed("QUEUE_HEARTBEAT_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.heartbeat_timeout),
                promote_batch: positive("QUEUE_PROMOTE_BATCH")
                    .map(|n| n as usize)
                    .unwrap_or(defaults.promote_batch),
            },
            queue_sweep_interval: positive("QUEUE_SWEEP_INTERVAL_SECS").map(Duration::from_secs),
            cache_ttl: parsed("CACHE_TTL_SECS").map(Duration::from_secs),
        }
    }
}
