mod metrics;

// Publicly expose the metric data model
pub use metrics::{
    HistogramValue, MetricDefinition, MetricError, MetricKind, MetricSnapshot, RegistrySnapshot,
    SampleValue,
};
