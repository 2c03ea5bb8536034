// Copyright 2026 the beacon authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pull-based plaintext exposition rendering.
//!
//! Each invocation walks the tracker's metrics in registration order and
//! writes a HELP line, a TYPE line, and one or more value lines per metric.
//! Histograms render one cumulative bucket line per configured threshold,
//! the mandatory `+Inf` bucket, then `_count` and `_sum`. Output is stable
//! for a fixed registration order and bucket list. Serving the result over
//! HTTP is left to an external handler.

use crate::tracker::{MetricEntry, MetricKind, MetricsTracker};
use beacon_core::histogram::SyncHistogram;
use std::fmt::Write;

/// Content type the exposition endpoint is expected to respond with.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Renders every registered metric into the text exposition format.
#[derive(Debug, Clone)]
pub struct TextExporter {
    tracker: MetricsTracker,
}

impl TextExporter {
    pub fn new(tracker: MetricsTracker) -> Self {
        Self { tracker }
    }

    /// One exposition document over the current metric values.
    pub fn render(&self) -> String {
        let entries = self.tracker.state.entries();
        let mut families = Vec::new();

        for entry in entries.iter() {
            match &entry.kind {
                // derived stats ship through the push pipeline; the
                // histogram itself renders natively below
                MetricKind::HistogramStat { .. } => continue,
                MetricKind::Counter(cell) => families.push(scalar_family(entry, cell.value())),
                MetricKind::Gauge(cell) => families.push(scalar_family(entry, cell.value())),
                MetricKind::Histogram { engine, buckets } => {
                    families.push(histogram_family(entry, engine, buckets))
                }
            }
        }
        families.join("\n")
    }
}

fn scalar_family(entry: &MetricEntry, value: i64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# HELP {} {}", entry.name, entry.description);
    let _ = writeln!(out, "# TYPE {} {}", entry.name, entry.metric_type.as_word());
    let _ = writeln!(out, "{}{} {}", entry.name, render_labels(&entry.tags), value);
    out
}

fn histogram_family(entry: &MetricEntry, engine: &SyncHistogram, buckets: &[i64]) -> String {
    let mut out = String::new();
    let total = engine.total_count();
    let labels = render_labels(&entry.tags);

    let _ = writeln!(out, "# HELP {} {}", entry.name, entry.description);
    let _ = writeln!(out, "# TYPE {} {}", entry.name, entry.metric_type.as_word());
    for &threshold in buckets {
        let _ = writeln!(
            out,
            "{}_bucket{} {}",
            entry.name,
            bucket_labels(&threshold.to_string(), &entry.tags),
            engine.count_at_or_below(threshold)
        );
    }
    // the +Inf bucket is mandatory and must equal the _count value
    let _ = writeln!(
        out,
        "{}_bucket{} {}",
        entry.name,
        bucket_labels("+Inf", &entry.tags),
        total
    );
    let _ = writeln!(out, "{}_count{} {}", entry.name, labels, total);
    let _ = writeln!(out, "{}_sum{} {}", entry.name, labels, engine.sum());
    out
}

fn render_labels(tags: &[(String, String)]) -> String {
    if tags.is_empty() {
        return String::new();
    }
    format!("{{ {} }}", label_body(tags))
}

fn bucket_labels(le: &str, tags: &[(String, String)]) -> String {
    if tags.is_empty() {
        return format!("{{ le=\"{le}\" }}");
    }
    format!("{{ le=\"{le}\", {} }}", label_body(tags))
}

fn label_body(tags: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = tags.iter().collect();
    sorted.sort_by(|left, right| left.0.cmp(&right.0));
    sorted
        .iter()
        .map(|(key, value)| format!("{key}=\"{value}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
