//! Overlay endpoints: the cached latest-event overlay, forced refresh and
//! synthetic-event simulation.

use std::ops::RangeInclusive;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::engine::SimulationParams;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run", get(run_latest).post(run))
        .route("/refresh", post(refresh))
        .route("/cache_state", get(cache_state))
        .route("/simulate", post(simulate))
}

/// Synthetic event parameters. `depth` is in kilometres.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SimulateRequest {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub depth: Option<f64>,
    pub mag: Option<f64>,
}

impl SimulateRequest {
    /// Check every parameter and collect all problems at once.
    pub fn validate(&self) -> Result<SimulationParams, ApiError> {
        let mut errors = Vec::new();
        let lat = require(&mut errors, "lat", self.lat, -90.0..=90.0, "must be between -90 and 90");
        let lon = require(&mut errors, "lon", self.lon, -180.0..=180.0, "must be between -180 and 180");
        let depth = require(&mut errors, "depth", self.depth, 0.0..=f64::MAX, "must not be negative");
        let mag = require(&mut errors, "mag", self.mag, f64::MIN..=f64::MAX, "out of range");

        match (lat, lon, depth, mag) {
            (Some(lat), Some(lon), Some(depth_km), Some(mag)) if errors.is_empty() => {
                Ok(SimulationParams {
                    lat,
                    lon,
                    depth_km,
                    mag,
                })
            }
            _ => Err(ApiError::validation(errors)),
        }
    }
}

fn require(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<f64>,
    range: RangeInclusive<f64>,
    out_of_range: &str,
) -> Option<f64> {
    match value {
        None => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
        Some(v) if !v.is_finite() => {
            errors.push(FieldError::new(field, "must be a finite number"));
            None
        }
        Some(v) if !range.contains(&v) => {
            errors.push(FieldError::new(field, out_of_range));
            None
        }
        Some(v) => Some(v),
    }
}

/// Body of `POST /api/run`. An empty body means "latest event, cached".
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RunRequest {
    /// `"simulate"` switches to simulation using the coordinates below.
    pub mode: Option<String>,
    /// Re-render even if the event has not changed.
    pub force: Option<bool>,
    #[serde(flatten)]
    pub simulation: SimulateRequest,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub ok: bool,
    #[schema(value_type = Object)]
    pub meta: Value,
    pub event_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CacheStateResponse {
    pub has_cache: bool,
    pub event_key: Option<String>,
    pub ts: Option<DateTime<Utc>>,
    pub ttl_sec: Option<u64>,
}

/// Parse an optional JSON body; an empty body yields the default.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}

// ---------------------------------------------------------------------------
// GET /api/run
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/run",
    tag = "Overlay",
    responses(
        (status = 200, description = "Overlay for the latest event"),
        (status = 502, description = "Engine failed and nothing is cached", body = ApiErrorBody),
    ),
)]
pub async fn run_latest(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let entry = state.cache.get_or_compute(false).await?;
    Ok(Json(entry.data.clone()))
}

// ---------------------------------------------------------------------------
// POST /api/run
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/run",
    tag = "Overlay",
    request_body(content = RunRequest, description = "Optional; empty body serves the cached overlay"),
    responses(
        (status = 200, description = "Overlay for the latest or simulated event"),
        (status = 400, description = "Invalid simulation parameters", body = ApiErrorBody),
        (status = 502, description = "Engine failure", body = ApiErrorBody),
    ),
)]
pub async fn run(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let req: RunRequest = parse_body(&body)?;

    if req.mode.as_deref() == Some("simulate") {
        let params = req.simulation.validate()?;
        return Ok(Json(state.cache.simulate(&params).await?));
    }

    let entry = state.cache.get_or_compute(req.force.unwrap_or(false)).await?;
    Ok(Json(entry.data.clone()))
}

// ---------------------------------------------------------------------------
// POST /api/refresh
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/refresh",
    tag = "Overlay",
    responses(
        (status = 200, description = "Overlay re-rendered", body = RefreshResponse),
        (status = 502, description = "Engine failure", body = ApiErrorBody),
    ),
)]
pub async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    let entry = state.cache.get_or_compute(true).await?;
    Ok(Json(RefreshResponse {
        ok: true,
        meta: entry.data.get("meta").cloned().unwrap_or_else(|| Value::Object(Default::default())),
        event_key: Some(entry.fingerprint.to_string()),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/cache_state
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/cache_state",
    tag = "Overlay",
    responses((status = 200, description = "Cache diagnostics", body = CacheStateResponse)),
)]
pub async fn cache_state(State(state): State<AppState>) -> Json<CacheStateResponse> {
    let cache = &state.cache;
    Json(CacheStateResponse {
        has_cache: cache.entry().is_some(),
        event_key: cache.current_fingerprint(),
        ts: cache.last_computed_at(),
        ttl_sec: cache.ttl().map(|ttl| ttl.as_secs()),
    })
}

// ---------------------------------------------------------------------------
// POST /api/simulate
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/simulate",
    tag = "Overlay",
    request_body = SimulateRequest,
    responses(
        (status = 200, description = "Overlay for the synthetic event"),
        (status = 400, description = "Invalid simulation parameters", body = ApiErrorBody),
        (status = 502, description = "Engine failure", body = ApiErrorBody),
    ),
)]
pub async fn simulate(
    State(state): State<AppState>,
    Json(body): Json<SimulateRequest>,
) -> Result<Json<Value>, ApiError> {
    let params = body.validate()?;
    Ok(Json(state.cache.simulate(&params).await?))
}
