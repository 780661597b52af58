//! Seismic event metadata and the fingerprint used for change detection.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata describing one seismic event, as reported by the overlay engine.
///
/// The document is kept as the engine sent it, so it can be handed back to
/// the engine unchanged. Event feeds and overlay `meta` documents name some
/// fields differently (`depth` vs `depth_km`, `time_th` vs `time_local`) and
/// do not agree on number encoding; the accessors below read either form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventMetadata(Map<String, Value>);

const TIME_KEYS: &[&str] = &["time_utc", "time_th", "time_local"];
const DEPTH_KEYS: &[&str] = &["depth_km", "depth"];

impl EventMetadata {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Read the `meta` sub-document of an overlay result. `None` when the
    /// overlay has no object-valued `meta`.
    pub fn from_overlay(overlay: &Value) -> Option<Self> {
        overlay
            .get("meta")
            .and_then(Value::as_object)
            .map(|meta| Self(meta.clone()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Event time: UTC when present, otherwise the local time.
    pub fn time(&self) -> Option<&Value> {
        self.first_of(TIME_KEYS)
    }

    /// Hypocentre depth in kilometres, under either field name.
    pub fn depth(&self) -> Option<&Value> {
        self.first_of(DEPTH_KEYS)
    }

    pub fn fingerprint(&self) -> EventFingerprint {
        EventFingerprint::of(self)
    }

    fn first_of(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.get(key))
            .find(|v| !matches!(v, Value::String(s) if s.trim().is_empty()))
    }
}

impl From<Map<String, Value>> for EventMetadata {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Cheap identity of an event: `time|lat|lon|mag|depth`.
///
/// Missing components render empty. Numbers render the same whether the
/// engine sent `7`, `7.0` or `"7"`, so an event and the `meta` of its
/// overlay agree. Events with equal fingerprints are the same event even if
/// other fields differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventFingerprint(String);

impl EventFingerprint {
    pub fn of(event: &EventMetadata) -> Self {
        Self(format!(
            "{}|{}|{}|{}|{}",
            render(event.time()),
            render(event.get("lat")),
            render(event.get("lon")),
            render(event.get("mag")),
            render(event.depth()),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EventFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) => v.to_string(),
            None => n.to_string(),
        },
        Some(Value::String(s)) => {
            let s = s.trim();
            match s.parse::<f64>() {
                Ok(v) if v.is_finite() => v.to_string(),
                _ => s.to_string(),
            }
        }
        Some(other) => other.to_string(),
    }
}
