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

//! The update seam shared by the live tracker and the in-memory test double.
//!
//! Application code holds a `dyn MetricSink` (or a generic) instead of the
//! concrete tracker, so unit tests can swap in `CapturedMetrics` and assert
//! on accumulated values without a scheduler or network.

use crate::metric::{CounterMetric, GaugeMetric, HistogramMetric};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Update operations against registered metrics. Every operation reports
/// failure (unknown handle, wrong kind, out-of-range value) as `false`,
/// never as a panic or an error type.
pub trait MetricSink: Send + Sync {
    /// Increments the counter at `id` by one.
    fn count(&self, id: CounterMetric) -> bool {
        self.count_n(id, 1)
    }

    /// Increments the counter at `id` by `increment`.
    fn count_n(&self, id: CounterMetric, increment: i64) -> bool;

    /// Overwrites the counter at `id` with an externally tracked total.
    fn raw_count(&self, id: CounterMetric, value: i64) -> bool;

    /// Sets the gauge at `id` to `value`.
    fn measure(&self, id: GaugeMetric, value: i64) -> bool;

    /// Records `value` into the histogram at `id`.
    fn record(&self, id: HistogramMetric, value: i64) -> bool;
}

/// In-memory sink for unit tests of code that depends on metrics.
///
/// Accepts every well-formed handle and remembers what was applied;
/// accessors expose the accumulated state for assertions.
#[derive(Debug, Default)]
pub struct CapturedMetrics {
    counters: Mutex<HashMap<CounterMetric, i64>>,
    gauges: Mutex<HashMap<GaugeMetric, i64>>,
    samples: Mutex<HashMap<HistogramMetric, Vec<i64>>>,
}

impl CapturedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated value of a captured counter, 0 if never counted.
    pub fn counter_value(&self, id: CounterMetric) -> i64 {
        *lock(&self.counters).get(&id).unwrap_or(&0)
    }

    /// The last measured value of a captured gauge, 0 if never measured.
    pub fn gauge_value(&self, id: GaugeMetric) -> i64 {
        *lock(&self.gauges).get(&id).unwrap_or(&0)
    }

    /// Every value recorded against a captured histogram, in order.
    pub fn recorded(&self, id: HistogramMetric) -> Vec<i64> {
        lock(&self.samples).get(&id).cloned().unwrap_or_default()
    }
}

impl MetricSink for CapturedMetrics {
    fn count_n(&self, id: CounterMetric, increment: i64) -> bool {
        if id.is_conflict() {
            return false;
        }
        *lock(&self.counters).entry(id).or_insert(0) += increment;
        true
    }

    fn raw_count(&self, id: CounterMetric, value: i64) -> bool {
        if id.is_conflict() {
            return false;
        }
        lock(&self.counters).insert(id, value);
        true
    }

    fn measure(&self, id: GaugeMetric, value: i64) -> bool {
        if id.is_conflict() {
            return false;
        }
        lock(&self.gauges).insert(id, value);
        true
    }

    fn record(&self, id: HistogramMetric, value: i64) -> bool {
        if id.is_conflict() {
            return false;
        }
        lock(&self.samples).entry(id).or_default().push(value);
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
