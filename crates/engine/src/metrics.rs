// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics registry with Prometheus-style text exposition.
//!
//! The metric set is closed: every family is registered up front with its
//! kind, label names, and (for histograms) bucket layout. The daemon serves
//! `render()` on the `/metrics` endpoint.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Counter,
    Gauge,
    Histogram,
}

#[derive(Debug, Clone)]
struct Hist {
    uppers: Vec<f64>,
    counts: Vec<u64>,
    sum: f64,
    count: u64,
}

#[derive(Debug, Clone)]
enum Sample {
    Value(f64),
    Histogram(Hist),
}

struct Family {
    kind: Kind,
    label_names: &'static [&'static str],
    help: &'static str,
    /// For histogram families: bucket upper bounds.
    uppers: Vec<f64>,
    samples: BTreeMap<Vec<String>, Sample>,
}

/// Exponential bucket upper bounds: `start * factor^i` for i in 0..count.
fn exponential_buckets(start: f64, factor: f64, count: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(count);
    let mut upper = start;
    for _ in 0..count {
        out.push(upper);
        upper *= factor;
    }
    out
}

/// Process-wide metrics registry.
pub struct Metrics {
    namespace: String,
    families: RwLock<BTreeMap<&'static str, Family>>,
}

impl Metrics {
    pub fn new(namespace: impl Into<String>) -> Arc<Self> {
        let metrics = Self {
            namespace: namespace.into(),
            families: RwLock::new(BTreeMap::new()),
        };

        metrics.register(Kind::Gauge, "service_health", &["service", "type", "chain"], "1 when the service is healthy", &[]);
        metrics.register(Kind::Counter, "service_restarts_total", &["service", "type"], "Restart attempts issued", &[]);
        metrics.register(Kind::Counter, "service_downtime_seconds_total", &["service", "type"], "Accumulated downtime", &[]);
        metrics.register(Kind::Gauge, "service_cpu_percent", &["service", "type"], "Sampled CPU usage", &[]);
        metrics.register(Kind::Gauge, "service_memory_bytes", &["service", "type"], "Sampled resident set size", &[]);
        metrics.register(Kind::Gauge, "service_disk_io_bytes_per_second", &["service", "type", "direction"], "Sampled disk throughput", &[]);
        metrics.register(Kind::Counter, "workflow_executions_total", &["workflow", "status"], "Workflow lifecycle transitions", &[]);
        metrics.register_histogram("workflow_duration_seconds", &["workflow"], "Workflow run duration", exponential_buckets(1.0, 2.0, 11));
        metrics.register(Kind::Counter, "activity_executions_total", &["activity", "status"], "Activity invocations by outcome", &[]);
        metrics.register_histogram("activity_duration_seconds", &["activity"], "Activity execution time", exponential_buckets(0.1, 2.0, 9));
        metrics.register(Kind::Counter, "activity_errors_total", &["activity", "error_type"], "Activity failures by class", &[]);
        metrics.register(Kind::Gauge, "node_sync_status", &["node", "chain"], "1 when the node reports synced", &[]);
        metrics.register(Kind::Gauge, "node_peer_count", &["node", "chain"], "Peers reported by the sync probe", &[]);
        metrics.register_histogram("dependency_wait_time_seconds", &["service", "dependency"], "Time spent waiting on ready signals", exponential_buckets(1.0, 2.0, 13));
        metrics.register(Kind::Counter, "dependency_timeouts_total", &["service", "dependency"], "Ready signals that timed out", &[]);
        metrics.register(Kind::Counter, "alerts_fired_total", &["alert_type", "severity", "service"], "Alerts dispatched to channels", &[]);
        metrics.register(Kind::Gauge, "alerts_active", &["alert_type", "severity"], "Currently active alerts", &[]);
        metrics.register(Kind::Counter, "breaker_transitions_total", &["breaker", "state"], "Circuit breaker state changes", &[]);

        Arc::new(metrics)
    }

    fn register(
        &self,
        kind: Kind,
        name: &'static str,
        label_names: &'static [&'static str],
        help: &'static str,
        uppers: &[f64],
    ) {
        self.families.write().insert(
            name,
            Family {
                kind,
                label_names,
                help,
                uppers: uppers.to_vec(),
                samples: BTreeMap::new(),
            },
        );
    }

    fn register_histogram(
        &self,
        name: &'static str,
        label_names: &'static [&'static str],
        help: &'static str,
        uppers: Vec<f64>,
    ) {
        self.families.write().insert(
            name,
            Family {
                kind: Kind::Histogram,
                label_names,
                help,
                uppers,
                samples: BTreeMap::new(),
            },
        );
    }

    pub fn inc_counter(&self, name: &str, labels: &[&str], delta: f64) {
        self.update(name, Kind::Counter, labels, |sample| {
            if let Sample::Value(v) = sample {
                *v += delta;
            }
        });
    }

    pub fn set_gauge(&self, name: &str, labels: &[&str], value: f64) {
        self.update(name, Kind::Gauge, labels, |sample| {
            if let Sample::Value(v) = sample {
                *v = value;
            }
        });
    }

    pub fn observe(&self, name: &str, labels: &[&str], value: f64) {
        self.update(name, Kind::Histogram, labels, |sample| {
            if let Sample::Histogram(h) = sample {
                h.sum += value;
                h.count += 1;
                for (i, upper) in h.uppers.iter().enumerate() {
                    if value <= *upper {
                        h.counts[i] += 1;
                    }
                }
            }
        });
    }

    fn update(&self, name: &str, kind: Kind, labels: &[&str], f: impl FnOnce(&mut Sample)) {
        let mut families = self.families.write();
        let Some(family) = families.get_mut(name) else {
            warn!(metric = name, "unregistered metric");
            return;
        };
        if family.kind != kind || family.label_names.len() != labels.len() {
            warn!(metric = name, "metric kind or label arity mismatch");
            return;
        }
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let sample = family.samples.entry(key).or_insert_with(|| match family.kind {
            Kind::Histogram => Sample::Histogram(Hist {
                uppers: family.uppers.clone(),
                counts: vec![0; family.uppers.len()],
                sum: 0.0,
                count: 0,
            }),
            _ => Sample::Value(0.0),
        });
        f(sample);
    }

    /// Current value of a counter or gauge (tests and status surfaces).
    pub fn value(&self, name: &str, labels: &[&str]) -> Option<f64> {
        let families = self.families.read();
        let family = families.get(name)?;
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        match family.samples.get(&key)? {
            Sample::Value(v) => Some(*v),
            Sample::Histogram(h) => Some(h.sum),
        }
    }

    /// Observation count of a histogram sample.
    pub fn histogram_count(&self, name: &str, labels: &[&str]) -> u64 {
        let families = self.families.read();
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        match families.get(name).and_then(|f| f.samples.get(&key)) {
            Some(Sample::Histogram(h)) => h.count,
            _ => 0,
        }
    }

    /// Render every family in the Prometheus text format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let families = self.families.read();
        for (name, family) in families.iter() {
            let full = self.full_name(name);
            let kind = match family.kind {
                Kind::Counter => "counter",
                Kind::Gauge => "gauge",
                Kind::Histogram => "histogram",
            };
            let _ = writeln!(out, "# HELP {} {}", full, family.help);
            let _ = writeln!(out, "# TYPE {} {}", full, kind);
            for (key, sample) in &family.samples {
                match sample {
                    Sample::Value(v) => {
                        let _ = writeln!(out, "{}{} {}", full, render_labels(family.label_names, key, None), fmt_value(*v));
                    }
                    Sample::Histogram(h) => {
                        // Bucket counts are cumulative: observe() increments
                        // every bucket whose upper bound admits the value.
                        for (i, upper) in h.uppers.iter().enumerate() {
                            let _ = writeln!(
                                out,
                                "{}_bucket{} {}",
                                full,
                                render_labels(family.label_names, key, Some(&fmt_value(*upper))),
                                h.counts[i]
                            );
                        }
                        let _ = writeln!(out, "{}_bucket{} {}", full, render_labels(family.label_names, key, Some("+Inf")), h.count);
                        let _ = writeln!(out, "{}_sum{} {}", full, render_labels(family.label_names, key, None), fmt_value(h.sum));
                        let _ = writeln!(out, "{}_count{} {}", full, render_labels(family.label_names, key, None), h.count);
                    }
                }
            }
        }
        out
    }

    fn full_name(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", self.namespace, name)
        }
    }
}

fn render_labels(names: &[&str], values: &[String], le: Option<&str>) -> String {
    let mut pairs: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(n, v)| format!("{}=\"{}\"", n, v.replace('"', "\\\"")))
        .collect();
    if let Some(le) = le {
        pairs.push(format!("le=\"{le}\""));
    }
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", pairs.join(","))
    }
}

fn fmt_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
