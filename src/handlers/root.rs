use axum::response::IntoResponse;

pub async fn root_handler() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"Welcome to the Observability API 👋
Version: {version}

Available endpoints:
  - GET /health   - Health check
  - GET /hello    - Greeting endpoint
  - GET /metrics  - Prometheus metrics exposition

Every request is instrumented: counters, a latency histogram, and one
structured log line per completed request.
"#
    )
}
