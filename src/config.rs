// src/config.rs

//! Application configuration loaded from environment variables.
//!
//! This module defines all startup-time configuration for the service.
//! Every value here is optional with a sensible default, so a bare
//! environment still yields a runnable process.

use anyhow::Result;
use std::time::Duration;

// ============================================================
// Local macros (config-only, intentionally explicit)
// ============================================================

/// Reads an optional environment variable and attempts to parse it.
///
/// If the variable is missing or cannot be parsed, the provided
/// default value is used. This macro is appropriate for non-critical
/// tuning parameters where fallback behavior is acceptable.
macro_rules! optional_env_parse {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        std::env::var($key)
            .ok()
            .and_then(|v| v.parse::<$ty>().ok())
            .unwrap_or($default)
    };
}

// ============================================================
// Public configuration facade
// ============================================================

/// Aggregated application configuration.
///
/// This is the single source of truth for startup configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: server::ServerConfig,
    pub metrics: metrics::MetricsConfig,
}

impl AppConfig {
    /// Loads all application configuration from the environment.
    ///
    /// Intended to be called once at startup; kept fallible for parity
    /// with future required settings.
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(Self {
            server: server::ServerConfig::from_env()?,
            metrics: metrics::MetricsConfig::from_env()?,
        })
    }
}

// ============================================================
// Server configuration
// ============================================================

mod server {
    // ---
    use super::*;

    /// HTTP listener configuration.
    #[derive(Debug, Clone)]
    pub struct ServerConfig {
        /// TCP port the server binds. Defaults to 3000.
        pub port: u16,
    }

    impl ServerConfig {
        /// Builds a [`ServerConfig`] from environment variables.
        pub fn from_env() -> Result<Self> {
            // ---
            let port = optional_env_parse!("PORT", u16, 3000);

            Ok(Self { port })
        }
    }
}
pub use server::ServerConfig;

// ============================================================
// Metrics configuration
// ============================================================

mod metrics {
    // ---
    use super::*;

    /// Tuning for the default process-metrics sampler.
    #[derive(Debug, Clone)]
    pub struct MetricsConfig {
        /// Interval between process-metric refreshes. Defaults to 10 seconds.
        pub refresh_interval: Duration,
    }

    impl MetricsConfig {
        /// Builds a [`MetricsConfig`] from environment variables.
        pub fn from_env() -> Result<Self> {
            // ---
            let refresh_secs = optional_env_parse!("METRICS_REFRESH_SEC", u64, 10);

            Ok(Self {
                refresh_interval: Duration::from_secs(refresh_secs),
            })
        }
    }
}
pub use metrics::MetricsConfig;

// ============================================================
// Tests
// ============================================================
