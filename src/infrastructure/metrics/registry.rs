//! Label-keyed metric registry.
//!
//! A `MetricRegistry` owns every named instrument in the process and their
//! per-label samples. It is created once at startup, injected by reference
//! into the request middleware and the exposition handler, and mutated
//! concurrently by every in-flight request.
//!
//! Concurrency discipline: the name → metric map sits behind an `RwLock`
//! (registrations happen at startup, observations only read it), and each
//! metric's sample table behind its own `Mutex`. An observation therefore
//! holds exactly one short per-metric critical section, and a histogram's
//! buckets, `sum`, and `count` update under the same lock so a snapshot can
//! never see them torn.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::domain::{
    HistogramValue, MetricDefinition, MetricError, MetricKind, MetricSnapshot, RegistrySnapshot,
    SampleValue,
};

/// Type alias for a shared registry handle.
pub type RegistryPtr = Arc<MetricRegistry>;

#[derive(Default)]
pub struct MetricRegistry {
    metrics: RwLock<HashMap<String, Arc<Metric>>>,
}

struct Metric {
    definition: MetricDefinition,
    samples: Mutex<HashMap<Vec<String>, SampleValue>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a metric definition.
    ///
    /// Idempotent when the exact same definition is already present;
    /// existing samples are left untouched in that case. Registering a name
    /// with a different shape fails with [`MetricError::DuplicateMetric`].
    pub fn register(&self, definition: MetricDefinition) -> Result<(), MetricError> {
        let mut metrics = write_lock(&self.metrics);

        if let Some(existing) = metrics.get(&definition.name) {
            if existing.definition == definition {
                return Ok(());
            }
            return Err(MetricError::DuplicateMetric(definition.name));
        }

        metrics.insert(
            definition.name.clone(),
            Arc::new(Metric {
                definition,
                samples: Mutex::new(HashMap::new()),
            }),
        );
        Ok(())
    }

    /// Records one observation, dispatching on the registered kind.
    ///
    /// - Counter: adds `value` (must be >= 0), creating a zero-valued sample
    ///   on first use.
    /// - Histogram: increments every bucket whose boundary >= `value`
    ///   (cumulative semantics), adds `value` to the sum and bumps the count.
    /// - Gauge: rejected; gauges are replaced via [`Self::set_gauge`].
    pub fn observe(
        &self,
        name: &str,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<(), MetricError> {
        let metric = self.metric(name)?;
        let values = metric.label_values(labels)?;

        match metric.definition.kind {
            MetricKind::Counter => {
                if value < 0.0 {
                    return Err(MetricError::InvalidObservation {
                        name: name.to_owned(),
                        value,
                        reason: "counters cannot decrease",
                    });
                }
                let mut samples = lock(&metric.samples);
                let sample = samples
                    .entry(values)
                    .or_insert(SampleValue::Counter(0.0));
                if let SampleValue::Counter(total) = sample {
                    *total += value;
                }
            }
            MetricKind::Histogram => {
                let buckets = &metric.definition.buckets;
                let mut samples = lock(&metric.samples);
                let sample = samples.entry(values).or_insert_with(|| {
                    SampleValue::Histogram(HistogramValue {
                        bucket_counts: vec![0; buckets.len()],
                        ..HistogramValue::default()
                    })
                });
                if let SampleValue::Histogram(hist) = sample {
                    for (i, boundary) in buckets.iter().enumerate() {
                        if value <= *boundary {
                            hist.bucket_counts[i] += 1;
                        }
                    }
                    hist.sum += value;
                    hist.count += 1;
                }
            }
            MetricKind::Gauge => {
                return Err(MetricError::InvalidObservation {
                    name: name.to_owned(),
                    value,
                    reason: "gauges are set, not observed",
                });
            }
        }
        Ok(())
    }

    /// Replaces a gauge sample's value, creating the sample on first use.
    pub fn set_gauge(
        &self,
        name: &str,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<(), MetricError> {
        let metric = self.metric(name)?;
        let values = metric.label_values(labels)?;

        if metric.definition.kind != MetricKind::Gauge {
            return Err(MetricError::InvalidObservation {
                name: name.to_owned(),
                value,
                reason: "only gauges can be set",
            });
        }

        let mut samples = lock(&metric.samples);
        samples.insert(values, SampleValue::Gauge(value));
        Ok(())
    }

    /// Produces an immutable point-in-time copy of every sample.
    ///
    /// Sample tables are copied one metric at a time, so writers are only
    /// ever blocked for one metric's copy. Cross-metric consistency is not
    /// promised; within one metric the copy is atomic.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let metrics = read_lock(&self.metrics);

        let mut out: Vec<MetricSnapshot> = metrics
            .values()
            .map(|metric| {
                let mut samples: Vec<(Vec<String>, SampleValue)> = {
                    let table = lock(&metric.samples);
                    table.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                };
                samples.sort_by(|a, b| a.0.cmp(&b.0));
                MetricSnapshot {
                    definition: metric.definition.clone(),
                    samples,
                }
            })
            .collect();

        out.sort_by(|a, b| a.definition.name.cmp(&b.definition.name));
        RegistrySnapshot { metrics: out }
    }

    fn metric(&self, name: &str) -> Result<Arc<Metric>, MetricError> {
        read_lock(&self.metrics)
            .get(name)
            .cloned()
            .ok_or_else(|| MetricError::UnknownMetric(name.to_owned()))
    }
}

impl Metric {
    /// Resolves label pairs into values ordered by the declared label names.
    ///
    /// Keys must cover the declared names exactly; order of the pairs does
    /// not matter. The returned vector is positional, which is what keeps
    /// the no-partial-labels invariant: a sample cannot exist without a
    /// value for every declared name.
    fn label_values(&self, labels: &[(&str, &str)]) -> Result<Vec<String>, MetricError> {
        let names = &self.definition.label_names;

        let mismatch = || MetricError::LabelMismatch {
            name: self.definition.name.clone(),
            expected: names.clone(),
            got: labels.iter().map(|(k, _)| (*k).to_owned()).collect(),
        };

        if labels.len() != names.len() {
            return Err(mismatch());
        }

        names
            .iter()
            .map(|name| {
                labels
                    .iter()
                    .find(|(key, _)| *key == name.as_str())
                    .map(|(_, value)| (*value).to_owned())
                    .ok_or_else(|| mismatch())
            })
            .collect()
    }
}

// Lock poisoning only happens if a panic escaped a critical section above;
// the data is still coherent (single increments), so recover the guard
// rather than poisoning every future observation.

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
