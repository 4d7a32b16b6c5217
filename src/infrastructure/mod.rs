pub mod metrics;

// Re-export the registry surface for easy access
pub use metrics::{
    register_default_metrics, render, spawn_default_metrics_sampler, MetricRegistry, RegistryPtr,
    CONTENT_TYPE,
};
