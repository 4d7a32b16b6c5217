use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HelloResponse {
    message: &'static str,
}

/// Trivial greeting endpoint.
pub async fn hello_handler() -> (StatusCode, Json<HelloResponse>) {
    (
        StatusCode::OK,
        Json(HelloResponse {
            message: "Hello DevOps",
        }),
    )
}
