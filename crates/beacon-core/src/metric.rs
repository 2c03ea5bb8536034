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

//! Metric identity: kinds, registration handles, and snapshot records.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// The reserved raw identifier signalling a failed registration.
///
/// Registration is meant to happen only at application startup; callers are
/// expected to check the returned handle with `is_conflict` rather than
/// handle a `Result`.
pub const METRIC_CONFLICT: i64 = -1;

/// The fundamental kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricType {
    /// A value that only ever accumulates (e.g. total requests).
    Counter,
    /// A value that can go up or down (e.g. current queue depth).
    Gauge,
    /// A value-distribution recorder with derived summary statistics.
    Histogram,
}

impl MetricType {
    /// The kind word used by the text exposition format and push backends.
    pub fn as_word(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
        }
    }
}

/// Handle to a registered counter. Stable for the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CounterMetric(i64);

/// Handle to a registered gauge. Stable for the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GaugeMetric(i64);

/// Handle to a registered histogram. Stable for the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HistogramMetric(i64);

impl CounterMetric {
    /// The sentinel handle returned by a rejected registration.
    pub const CONFLICT: CounterMetric = CounterMetric(METRIC_CONFLICT);

    pub fn new(raw: i64) -> Self {
        Self(raw)
    }
    pub fn raw(&self) -> i64 {
        self.0
    }
    /// True when this handle signals a failed registration.
    pub fn is_conflict(&self) -> bool {
        self.0 < 0
    }
    /// The registry slot this handle refers to, `None` for the sentinel.
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl GaugeMetric {
    /// The sentinel handle returned by a rejected registration.
    pub const CONFLICT: GaugeMetric = GaugeMetric(METRIC_CONFLICT);

    pub fn new(raw: i64) -> Self {
        Self(raw)
    }
    pub fn raw(&self) -> i64 {
        self.0
    }
    /// True when this handle signals a failed registration.
    pub fn is_conflict(&self) -> bool {
        self.0 < 0
    }
    /// The registry slot this handle refers to, `None` for the sentinel.
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl HistogramMetric {
    /// The sentinel handle returned by a rejected registration.
    pub const CONFLICT: HistogramMetric = HistogramMetric(METRIC_CONFLICT);

    pub fn new(raw: i64) -> Self {
        Self(raw)
    }
    pub fn raw(&self) -> i64 {
        self.0
    }
    /// True when this handle signals a failed registration.
    pub fn is_conflict(&self) -> bool {
        self.0 < 0
    }
    /// The registry slot this handle refers to, `None` for the sentinel.
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

/// An immutable point-in-time snapshot of one metric's value, produced once
/// per overdue reporting interval and handed to downstream consumers.
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    /// The raw registry identifier of the snapshotted metric.
    pub id: i64,
    /// The metric name at registration time.
    pub name: String,
    /// Wall-clock instant at which the snapshot was taken.
    pub captured: SystemTime,
    /// The captured value.
    pub value: i64,
    /// The kind tag shipped alongside the value.
    pub metric_type: MetricType,
    /// Resolved key/value tag pairs.
    pub tags: Vec<(String, String)>,
}

impl Measurement {
    /// Seconds since the Unix epoch for the captured instant.
    pub fn unix_time(&self) -> i64 {
        self.captured
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Sending half of the snapshot pipeline between tracker and publisher.
pub type MeasurementSender = flume::Sender<Vec<Measurement>>;
/// Receiving half of the snapshot pipeline between tracker and publisher.
pub type MeasurementReceiver = flume::Receiver<Vec<Measurement>>;

/// Creates the bounded channel carrying snapshot batches downstream.
pub fn measurement_channel(capacity: usize) -> (MeasurementSender, MeasurementReceiver) {
    flume::bounded(capacity)
}
