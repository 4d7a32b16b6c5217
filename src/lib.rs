// src/lib.rs
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;

use app_state::AppState;
use handlers::{health_check, hello_handler, metrics_handler, not_found, root_handler};

// Public exports (visible outside this module)
pub mod domain;

// Internal-only exports (sibling access within this module)
mod app_state;
mod config;
mod handlers;
mod infrastructure;
mod middleware;

pub use config::*;

// Publicly expose the registry surface and the request metric names
pub use infrastructure::metrics::{MetricRegistry, RegistryPtr, CONTENT_TYPE};
pub use middleware::{
    HTTP_ERRORS_TOTAL, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS, UNMATCHED_ROUTE,
};

/// Build the HTTP router with its own metric registry.
///
/// Creates the registry, registers the request metrics and the default
/// process metrics, spawns the background process sampler, and wires the
/// instrumentation middleware around every route (fallback included).
/// Must run inside a tokio runtime because of the sampler task.
pub fn create_router() -> Result<Router> {
    // ---
    // Load all configuration from environment
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt::try_init().ok(); // ✅ Ignores if already initialized

    // One explicitly-owned registry per router; no process-wide singleton.
    let registry: RegistryPtr = Arc::new(MetricRegistry::new());

    // An incompatible re-registration here is a startup bug; fail fast
    // rather than serving traffic with an inconsistent metric schema.
    middleware::register_request_metrics(&registry)?;
    infrastructure::metrics::register_default_metrics(&registry)?;

    infrastructure::metrics::spawn_default_metrics_sampler(
        Arc::clone(&registry),
        config.metrics.refresh_interval,
    );

    Ok(build_router(AppState::new(registry)))
}

/// Router wiring shared by `create_router` and in-crate tests that inject
/// their own registry.
fn build_router(state: AppState) -> Router {
    // The instrumentation layer wraps routes and fallback alike, so every
    // request terminating here is observed exactly once.
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/hello", get(hello_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .with_state(state)
}
