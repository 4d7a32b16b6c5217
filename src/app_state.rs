//! Application state management.
//!
//! This module defines the shared state structure that gets passed to all
//! Axum handlers via the `State` extractor. The `AppState` holds the one
//! metric registry instance for the process.
//!
//! The state is designed to be cheaply cloneable (the registry sits behind
//! an `Arc`) so it can be passed efficiently to each request handler.

use crate::infrastructure::metrics::RegistryPtr;

/// Shared application state passed to all Axum handlers.
///
/// The registry is created once in `create_router()` at startup,
/// constructor-injected here, and lives for the process lifetime. There is
/// deliberately no global registry: every consumer (the instrumentation
/// middleware, the exposition handler, the process sampler) receives this
/// same explicitly-owned instance.
#[derive(Clone)]
pub(crate) struct AppState {
    /// Metric registry mutated by every request and read at scrape time.
    registry: RegistryPtr,
}

impl AppState {
    // ---

    pub fn new(registry: RegistryPtr) -> Self {
        AppState { registry }
    }

    /// Get a reference to the metric registry.
    pub(crate) fn registry(&self) -> &RegistryPtr {
        // ---
        &self.registry
    }
}
