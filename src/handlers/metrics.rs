use crate::app_state::AppState;
use crate::infrastructure::metrics::{render, CONTENT_TYPE};
use axum::{extract::State, http::StatusCode, response::IntoResponse};

/// Handler for the `/metrics` endpoint.
///
/// Takes a point-in-time snapshot of the registry and returns it in the
/// Prometheus text exposition format. The snapshot reflects every
/// observation that completed before this call, process-wide.
pub async fn metrics_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    // ---

    let metrics_text = render(&app_state.registry().snapshot());

    (
        StatusCode::OK,
        [("content-type", CONTENT_TYPE)],
        metrics_text,
    )
}
