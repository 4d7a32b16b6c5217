// Gateway module - controls public API for handlers
// Modules are private, only exported symbols are public

mod fallback;
mod health;
mod hello;
mod metrics;
mod root;

// Core handlers
pub use fallback::not_found;
pub use health::health_check;
pub use hello::hello_handler;
pub use metrics::metrics_handler;
pub use root::root_handler;
