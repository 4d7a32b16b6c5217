//! Prometheus text exposition format (version 0.0.4).
//!
//! Serializes a registry snapshot to the line-oriented pull format: per
//! metric a `# HELP` and `# TYPE` comment, then one line per label set.
//! Histograms additionally emit `_bucket` lines with a cumulative `le`
//! label (including the implicit `+Inf`), plus `_sum` and `_count`.

use std::fmt::Write;

use crate::domain::{MetricSnapshot, RegistrySnapshot, SampleValue};

/// Content type advertised by the exposition endpoint. Scrapers match on
/// this exactly, version included.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders a full snapshot to exposition text.
pub fn render(snapshot: &RegistrySnapshot) -> String {
    let mut out = String::new();
    for metric in &snapshot.metrics {
        render_metric(&mut out, metric);
    }
    out
}

fn render_metric(out: &mut String, metric: &MetricSnapshot) {
    let def = &metric.definition;

    // String sink: writeln! cannot fail here.
    let _ = writeln!(out, "# HELP {} {}", def.name, escape_help(&def.help));
    let _ = writeln!(out, "# TYPE {} {}", def.name, def.kind.as_str());

    for (values, sample) in &metric.samples {
        match sample {
            SampleValue::Counter(v) | SampleValue::Gauge(v) => {
                let labels = label_block(&def.label_names, values, None);
                let _ = writeln!(out, "{}{} {}", def.name, labels, v);
            }
            SampleValue::Histogram(hist) => {
                for (i, boundary) in def.buckets.iter().enumerate() {
                    let labels =
                        label_block(&def.label_names, values, Some(&boundary.to_string()));
                    let _ = writeln!(
                        out,
                        "{}_bucket{} {}",
                        def.name, labels, hist.bucket_counts[i]
                    );
                }
                let labels = label_block(&def.label_names, values, Some("+Inf"));
                let _ = writeln!(out, "{}_bucket{} {}", def.name, labels, hist.count);

                let labels = label_block(&def.label_names, values, None);
                let _ = writeln!(out, "{}_sum{} {}", def.name, labels, hist.sum);
                let _ = writeln!(out, "{}_count{} {}", def.name, labels, hist.count);
            }
        }
    }
}

/// Formats the `{name="value",...}` block, optionally appending the
/// histogram `le` label. Returns an empty string for unlabeled samples.
fn label_block(names: &[String], values: &[String], le: Option<&str>) -> String {
    if names.is_empty() && le.is_none() {
        return String::new();
    }

    let mut parts: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(name, value)| format!("{name}=\"{}\"", escape_label(value)))
        .collect();
    if let Some(le) = le {
        parts.push(format!("le=\"{le}\""));
    }
    format!("{{{}}}", parts.join(","))
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
