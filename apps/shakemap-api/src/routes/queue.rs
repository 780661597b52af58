//! Admission queue endpoints. Browser tabs enter, poll with heartbeats while
//! they use the map, and leave when closed.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shakemap_common::SessionKey;
use utoipa::ToSchema;

use crate::admission::QueueStatus;
use crate::error::{ApiError, ApiErrorBody};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queue/enter", post(enter))
        .route("/queue/status", get(status))
        .route("/queue/heartbeat", post(heartbeat))
        .route("/queue/leave", post(leave))
}

/// Identifies one browser tab. Both fields are required and non-empty.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionRequest {
    pub client_id: Option<String>,
    pub tab_id: Option<String>,
}

impl SessionRequest {
    fn into_key(self) -> Result<SessionKey, ApiError> {
        SessionKey::from_parts(self.client_id, self.tab_id)
            .ok_or_else(|| ApiError::bad_request("missing client_id/tab_id"))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveResponse {
    pub ok: bool,
    pub active: usize,
    pub limit: usize,
}

// ---------------------------------------------------------------------------
// POST /api/queue/enter
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/queue/enter",
    tag = "Queue",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Admitted or queued", body = QueueStatus),
        (status = 400, description = "Missing client_id/tab_id", body = ApiErrorBody),
    ),
)]
pub async fn enter(
    State(state): State<AppState>,
    Json(body): Json<SessionRequest>,
) -> Result<Json<QueueStatus>, ApiError> {
    let key = body.into_key()?;
    Ok(Json(state.queue.enter(&key)))
}

// ---------------------------------------------------------------------------
// GET /api/queue/status
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/queue/status",
    tag = "Queue",
    params(
        ("client_id" = String, Query, description = "Client ID"),
        ("tab_id" = String, Query, description = "Tab ID"),
    ),
    responses(
        (status = 200, description = "Current admission state", body = QueueStatus),
        (status = 400, description = "Missing client_id/tab_id", body = ApiErrorBody),
    ),
)]
pub async fn status(
    State(state): State<AppState>,
    Query(params): Query<SessionRequest>,
) -> Result<Json<QueueStatus>, ApiError> {
    let key = params.into_key()?;
    Ok(Json(state.queue.status(&key)))
}

// ---------------------------------------------------------------------------
// POST /api/queue/heartbeat
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/queue/heartbeat",
    tag = "Queue",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Current admission state; active sessions are kept alive", body = QueueStatus),
        (status = 400, description = "Missing client_id/tab_id", body = ApiErrorBody),
    ),
)]
pub async fn heartbeat(
    State(state): State<AppState>,
    Json(body): Json<SessionRequest>,
) -> Result<Json<QueueStatus>, ApiError> {
    let key = body.into_key()?;
    Ok(Json(state.queue.heartbeat(&key)))
}

// ---------------------------------------------------------------------------
// POST /api/queue/leave
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/queue/leave",
    tag = "Queue",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Session released", body = LeaveResponse),
        (status = 400, description = "Missing client_id/tab_id", body = ApiErrorBody),
    ),
)]
pub async fn leave(
    State(state): State<AppState>,
    Json(body): Json<SessionRequest>,
) -> Result<Json<LeaveResponse>, ApiError> {
    let key = body.into_key()?;
    let counts = state.queue.leave(&key);
    tracing::info!(
        session = %key,
        active = counts.active_count,
        waiting = counts.waiting_count,
        "session released"
    );
    Ok(Json(LeaveResponse {
        ok: true,
        active: counts.active_count,
        limit: counts.limit,
    }))
}
