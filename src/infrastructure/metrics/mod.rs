mod exposition;
mod process;
mod registry;

pub use exposition::{render, CONTENT_TYPE};
pub use process::{register_default_metrics, spawn_default_metrics_sampler};
pub use registry::{MetricRegistry, RegistryPtr};
