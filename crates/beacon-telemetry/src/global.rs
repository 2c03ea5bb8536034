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

//! Optional process-wide convenience wrapper.
//!
//! The explicit `MetricsTracker` object is the primary API; this module
//! layers free functions over one lazily initialized process-wide instance
//! for programs that don't want to thread a tracker through every
//! collaborator. Everything here forwards verbatim.

use crate::tracker::MetricsTracker;
use beacon_core::metric::{
    CounterMetric, GaugeMetric, HistogramMetric, MeasurementSender,
};
use beacon_core::sink::MetricSink;
use std::sync::OnceLock;
use std::time::Duration;

static TRACKER: OnceLock<MetricsTracker> = OnceLock::new();

/// The process-wide tracker, created on first use.
pub fn tracker() -> &'static MetricsTracker {
    TRACKER.get_or_init(MetricsTracker::new)
}

pub fn add_counter(name: &str, frequency: Duration) -> CounterMetric {
    tracker().add_counter(name, frequency)
}

pub fn add_gauge(name: &str, frequency: Duration) -> GaugeMetric {
    tracker().add_gauge(name, frequency)
}

pub fn add_histogram(
    name: &str,
    frequency: Duration,
    min: i64,
    max: i64,
    resolution: u32,
    quantiles: &[f64],
) -> HistogramMetric {
    tracker().add_histogram(name, frequency, min, max, resolution, quantiles)
}

pub fn count(id: CounterMetric) -> bool {
    tracker().count(id)
}

pub fn count_n(id: CounterMetric, increment: i64) -> bool {
    tracker().count_n(id, increment)
}

pub fn raw_count(id: CounterMetric, value: i64) -> bool {
    tracker().raw_count(id, value)
}

pub fn measure(id: GaugeMetric, value: i64) -> bool {
    tracker().measure(id, value)
}

pub fn record(id: HistogramMetric, value: i64) -> bool {
    tracker().record(id, value)
}

pub fn tag_counter(id: CounterMetric, tags: &[&str]) {
    tracker().tag_counter(id, tags)
}

pub fn tag_gauge(id: GaugeMetric, tags: &[&str]) {
    tracker().tag_gauge(id, tags)
}

pub fn tag_histogram(id: HistogramMetric, tags: &[&str]) {
    tracker().tag_histogram(id, tags)
}

pub fn tag_all(tags: &[&str]) {
    tracker().tag_all(tags)
}

pub fn start_measuring() {
    tracker().start_measuring()
}

pub fn stop_measuring() {
    tracker().stop_measuring()
}

pub fn set_destination(sender: MeasurementSender) {
    tracker().set_destination(sender)
}
