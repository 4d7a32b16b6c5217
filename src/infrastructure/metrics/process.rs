//! Default process metrics.
//!
//! Registers the process-level gauges (resident memory, open file
//! descriptors, uptime) and the CPU-time counter, and refreshes them from
//! procfs on an independent periodic task. Collection is request-agnostic:
//! the sampler contends with request-driven writers only at the per-sample
//! level.
//!
//! Procfs reads are Linux-only; on other targets the gauges are registered
//! but never updated beyond uptime.

use std::time::{Duration, Instant};

use crate::domain::{MetricDefinition, MetricError};

use super::registry::{MetricRegistry, RegistryPtr};

pub const PROCESS_RESIDENT_MEMORY_BYTES: &str = "process_resident_memory_bytes";
pub const PROCESS_CPU_SECONDS_TOTAL: &str = "process_cpu_seconds_total";
pub const PROCESS_OPEN_FDS: &str = "process_open_fds";
pub const PROCESS_UPTIME_SECONDS: &str = "process_uptime_seconds";

/// Registers the default process metrics on `registry`.
pub fn register_default_metrics(registry: &MetricRegistry) -> Result<(), MetricError> {
    registry.register(MetricDefinition::gauge(
        PROCESS_RESIDENT_MEMORY_BYTES,
        "Resident memory size in bytes.",
        &[],
    ))?;
    registry.register(MetricDefinition::counter(
        PROCESS_CPU_SECONDS_TOTAL,
        "Total user and system CPU time spent in seconds.",
        &[],
    ))?;
    registry.register(MetricDefinition::gauge(
        PROCESS_OPEN_FDS,
        "Number of open file descriptors.",
        &[],
    ))?;
    registry.register(MetricDefinition::gauge(
        PROCESS_UPTIME_SECONDS,
        "Process uptime in seconds.",
        &[],
    ))?;
    Ok(())
}

/// Spawns the background sampler refreshing the default metrics every
/// `interval`. The first tick fires immediately, so samples exist before
/// the first scrape.
pub fn spawn_default_metrics_sampler(
    registry: RegistryPtr,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let started = Instant::now();
        let mut sampler = ProcessSampler::default();
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            sampler.sample(&registry, started);
        }
    })
}

/// Tracks the last CPU reading so the counter is fed monotonic deltas.
#[derive(Default)]
struct ProcessSampler {
    last_cpu_seconds: f64,
}

impl ProcessSampler {
    fn sample(&mut self, registry: &MetricRegistry, started: Instant) {
        set_gauge_or_log(registry, PROCESS_UPTIME_SECONDS, started.elapsed().as_secs_f64());

        if let Some(rss) = resident_memory_bytes() {
            set_gauge_or_log(registry, PROCESS_RESIDENT_MEMORY_BYTES, rss);
        }
        if let Some(fds) = open_fds() {
            set_gauge_or_log(registry, PROCESS_OPEN_FDS, fds);
        }
        if let Some(total) = cpu_seconds_total() {
            let delta = total - self.last_cpu_seconds;
            if delta > 0.0 {
                if let Err(err) = registry.observe(PROCESS_CPU_SECONDS_TOTAL, &[], delta) {
                    tracing::error!(
                        metric = PROCESS_CPU_SECONDS_TOTAL,
                        error = %err,
                        "failed to update process metric"
                    );
                }
                self.last_cpu_seconds = total;
            }
        }
    }
}

fn set_gauge_or_log(registry: &MetricRegistry, name: &str, value: f64) {
    if let Err(err) = registry.set_gauge(name, &[], value) {
        tracing::error!(metric = name, error = %err, "failed to update process metric");
    }
}

/// Resident set size from /proc/self/status (VmRSS, reported in kB).
#[cfg(target_os = "linux")]
fn resident_memory_bytes() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<f64>().ok())
        .map(|kb| kb * 1024.0)
}

/// Combined user + system CPU time from /proc/self/stat.
#[cfg(target_os = "linux")]
fn cpu_seconds_total() -> Option<f64> {
    // Kernel ticks per second; fixed at 100 on Linux.
    const CLK_TCK: f64 = 100.0;

    let stat = std::fs::read_to_string("/proc/self/stat").ok()?;
    // comm can contain spaces, so count fields after the closing paren:
    // utime and stime are stat fields 14 and 15, offsets 11 and 12 here.
    let rest = stat.rsplit_once(')').map(|(_, rest)| rest)?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let utime: f64 = fields.get(11)?.parse().ok()?;
    let stime: f64 = fields.get(12)?.parse().ok()?;
    Some((utime + stime) / CLK_TCK)
}

#[cfg(target_os = "linux")]
fn open_fds() -> Option<f64> {
    std::fs::read_dir("/proc/self/fd")
        .ok()
        .map(|entries| entries.count() as f64)
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_bytes() -> Option<f64> {
    None
}

#[cfg(not(target_os = "linux"))]
fn cpu_seconds_total() -> Option<f64> {
    None
}

#[cfg(not(target_os = "linux"))]
fn open_fds() -> Option<f64> {
    None
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::domain::SampleValue;

    fn sample_value(registry: &MetricRegistry, name: &str) -> Option<SampleValue> {
        registry
            .snapshot()
            .metrics
            .iter()
            .find(|m| m.definition.name == name)
            .and_then(|m| m.samples.first().map(|(_, v)| v.clone()))
    }

    #[test]
    fn registers_all_default_metrics() {
        let registry = MetricRegistry::new();
        register_default_metrics(&registry).unwrap();

        let snapshot = registry.snapshot();
        let names: Vec<&str> = snapshot
            .metrics
            .iter()
            .map(|m| m.definition.name.as_str())
            .collect();
        assert!(names.contains(&PROCESS_RESIDENT_MEMORY_BYTES));
        assert!(names.contains(&PROCESS_CPU_SECONDS_TOTAL));
        assert!(names.contains(&PROCESS_OPEN_FDS));
        assert!(names.contains(&PROCESS_UPTIME_SECONDS));

        // Re-registration (e.g. two routers sharing a registry) is harmless.
        register_default_metrics(&registry).unwrap();
    }

    #[test]
    fn sampler_records_uptime() {
        let registry = MetricRegistry::new();
        register_default_metrics(&registry).unwrap();

        let started = Instant::now() - Duration::from_secs(5);
        ProcessSampler::default().sample(&registry, started);

        match sample_value(&registry, PROCESS_UPTIME_SECONDS) {
            Some(SampleValue::Gauge(uptime)) => assert!(uptime >= 5.0),
            other => panic!("unexpected sample: {other:?}"),
        }
    }

    #[test]
    fn cpu_counter_never_decreases() {
        let registry = MetricRegistry::new();
        register_default_metrics(&registry).unwrap();

        let started = Instant::now();
        let mut sampler = ProcessSampler::default();
        sampler.sample(&registry, started);
        let first = match sample_value(&registry, PROCESS_CPU_SECONDS_TOTAL) {
            Some(SampleValue::Counter(v)) => v,
            None => return, // procfs unavailable on this target
            other => panic!("unexpected sample: {other:?}"),
        };

        // Burn a little CPU so the second reading has a chance to move.
        let mut x = 0u64;
        for i in 0..2_000_000u64 {
            x = x.wrapping_add(i);
        }
        std::hint::black_box(x);

        sampler.sample(&registry, started);
        match sample_value(&registry, PROCESS_CPU_SECONDS_TOTAL) {
            Some(SampleValue::Counter(second)) => assert!(second >= first),
            other => panic!("unexpected sample: {other:?}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn procfs_readers_return_plausible_values() {
        assert!(resident_memory_bytes().is_some_and(|rss| rss > 0.0));
        assert!(open_fds().is_some_and(|fds| fds > 0.0));
        assert!(cpu_seconds_total().is_some_and(|cpu| cpu >= 0.0));
    }
}
