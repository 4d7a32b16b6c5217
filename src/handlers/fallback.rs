use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    error: &'static str,
}

/// Fallback for requests that match no route.
///
/// Runs inside the instrumentation layer like every other handler, so
/// unmatched requests show up in the error counter with a 404 status.
pub async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse { error: "Not found" }),
    )
}
