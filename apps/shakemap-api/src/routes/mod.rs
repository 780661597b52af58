pub mod health;
pub mod queue;
pub mod run;

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api", queue::router().merge(run::router()))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Queue
        queue::enter,
        queue::status,
        queue::heartbeat,
        queue::leave,
        // Overlay
        run::run_latest,
        run::run,
        run::refresh,
        run::cache_state,
        run::simulate,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Admission
            crate::admission::QueueState,
            crate::admission::QueueStatus,
            // Route request/response types
            health::HealthResponse,
            queue::SessionRequest,
            queue::LeaveResponse,
            run::RunRequest,
            run::SimulateRequest,
            run::RefreshResponse,
            run::CacheStateResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Queue", description = "Admission control for concurrent viewers"),
        (name = "Overlay", description = "Shake-map overlays for the latest or a simulated event"),
    )
)]
pub struct ApiDoc;
