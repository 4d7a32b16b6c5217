//! Core metric data model.
//!
//! Types shared between the registry, the exposition encoder, and
//! instrumentation call sites. The registry itself lives in
//! `infrastructure::metrics`; this module only defines the shapes it
//! stores and the errors it can raise.

use thiserror::Error;

/// The kind of a registered metric instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    /// Name used in the `# TYPE` line of the exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Immutable shape of a metric: name, help text, kind, declared label
/// names, and (for histograms) the bucket boundaries.
///
/// A name is unique within a registry. Registering the same name twice
/// with an identical definition is idempotent; registering it with a
/// different shape is a [`MetricError::DuplicateMetric`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefinition {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
    /// Ascending bucket boundaries; empty unless `kind` is `Histogram`.
    /// The +Inf bucket is implicit and never listed here.
    pub buckets: Vec<f64>,
}

impl MetricDefinition {
    pub fn counter(name: &str, help: &str, label_names: &[&str]) -> Self {
        Self::new(name, help, MetricKind::Counter, label_names, &[])
    }

    pub fn gauge(name: &str, help: &str, label_names: &[&str]) -> Self {
        Self::new(name, help, MetricKind::Gauge, label_names, &[])
    }

    pub fn histogram(name: &str, help: &str, label_names: &[&str], buckets: &[f64]) -> Self {
        Self::new(name, help, MetricKind::Histogram, label_names, buckets)
    }

    fn new(
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Self {
        // Buckets must be ascending and unique for cumulative semantics to
        // hold; normalize here so every definition built through these
        // constructors is well formed.
        let mut buckets = buckets.to_vec();
        buckets.sort_by(|a, b| a.total_cmp(b));
        buckets.dedup();

        MetricDefinition {
            name: name.to_owned(),
            help: help.to_owned(),
            kind,
            label_names: label_names.iter().map(|s| (*s).to_owned()).collect(),
            buckets,
        }
    }
}

/// Accumulated state of one label combination.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    /// Monotonically non-decreasing total.
    Counter(f64),
    /// Last set value.
    Gauge(f64),
    Histogram(HistogramValue),
}

/// Cumulative histogram state.
///
/// `bucket_counts[i]` counts every observation `<=` the definition's
/// `buckets[i]`, so counts are non-decreasing by boundary. The implicit
/// +Inf bucket equals `count`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistogramValue {
    pub bucket_counts: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

/// Point-in-time copy of one metric: its definition plus every sample,
/// keyed by label values in `label_names` order.
#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    pub definition: MetricDefinition,
    pub samples: Vec<(Vec<String>, SampleValue)>,
}

/// Point-in-time copy of a whole registry, sorted by metric name.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub metrics: Vec<MetricSnapshot>,
}

/// Errors raised by registry operations.
///
/// `DuplicateMetric` is fatal at startup (the process must not serve
/// traffic with an inconsistent metric schema). The rest are programmer
/// errors from mis-wired call sites: instrumentation code logs them and
/// drops the observation, never failing the surrounding request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    #[error("metric `{0}` already registered with an incompatible definition")]
    DuplicateMetric(String),

    #[error("metric `{0}` is not registered")]
    UnknownMetric(String),

    #[error("metric `{name}` expects labels {expected:?}, got {got:?}")]
    LabelMismatch {
        name: String,
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("metric `{name}` rejects value {value}: {reason}")]
    InvalidObservation {
        name: String,
        value: f64,
        reason: &'static str,
    },
}
