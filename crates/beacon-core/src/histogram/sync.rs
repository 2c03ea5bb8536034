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

//! Reader/writer-lock adapter around the histogram engine.
//!
//! The engine updates its bucket array, total, and sum together, so a
//! read-consistent view requires exclusive recording and shared reads. The
//! adapter serializes access so the engine itself stays single-threaded.

use super::engine::{Histogram, HistogramError};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe wrapper: `record` takes the write lock, every read statistic
/// the read lock.
#[derive(Debug)]
pub struct SyncHistogram {
    inner: RwLock<Histogram>,
}

impl SyncHistogram {
    pub fn new(inner: Histogram) -> Self {
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Builds the engine and wraps it in one step.
    pub fn with_range(min: i64, max: i64, resolution: u32) -> Result<Self, HistogramError> {
        Histogram::new(min, max, resolution).map(Self::new)
    }

    pub fn record(&self, value: i64) -> Result<(), HistogramError> {
        self.write().record(value)
    }

    pub fn min(&self) -> i64 {
        self.read().min()
    }

    pub fn max(&self) -> i64 {
        self.read().max()
    }

    pub fn mean(&self) -> f64 {
        self.read().mean()
    }

    pub fn stddev(&self) -> f64 {
        self.read().stddev()
    }

    pub fn total_count(&self) -> u64 {
        self.read().total_count()
    }

    pub fn sum(&self) -> i64 {
        self.read().sum()
    }

    pub fn value_at_quantile(&self, quantile: f64) -> i64 {
        self.read().value_at_quantile(quantile)
    }

    pub fn count_at_or_below(&self, value: i64) -> u64 {
        self.read().count_at_or_below(value)
    }

    pub fn min_trackable(&self) -> i64 {
        self.read().min_trackable()
    }

    pub fn max_trackable(&self) -> i64 {
        self.read().max_trackable()
    }

    // record() never leaves the engine torn, so a guard poisoned by a
    // panicking reader elsewhere is still safe to reuse.
    fn read(&self) -> RwLockReadGuard<'_, Histogram> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Histogram> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_recording_reaches_a_consistent_total() {
        let histogram =
            Arc::new(SyncHistogram::with_range(0, 10_000, 3).expect("valid configuration"));
        let mut handles = Vec::new();

        for worker in 0..8 {
            let histogram = Arc::clone(&histogram);
            handles.push(thread::spawn(move || {
                for offset in 0..500 {
                    histogram
                        .record(worker * 100 + offset % 100)
                        .expect("in-range value");
                }
            }));
        }
        for handle in handles {
            handle.join().expect("recording thread panicked");
        }

        assert_eq!(histogram.total_count(), 8 * 500);
        assert!(histogram.max() <= 10_000);
    }

    #[test]
    fn out_of_range_recording_fails_through_the_adapter() {
        let histogram = SyncHistogram::with_range(10, 20, 2).expect("valid configuration");
        assert!(histogram.record(15).is_ok());
        assert!(histogram.record(9).is_err());
        assert!(histogram.record(21).is_err());
        assert_eq!(histogram.total_count(), 1);
    }

    #[test]
    fn reads_observe_recorded_statistics() {
        let histogram = SyncHistogram::with_range(0, 1_000, 3).expect("valid configuration");
        for value in [5, 10, 15] {
            histogram.record(value).expect("in-range value");
        }

        assert_eq!(histogram.min(), 5);
        assert_eq!(histogram.max(), 15);
        assert_eq!(histogram.total_count(), 3);
        assert_eq!(histogram.sum(), 30);
        assert!((histogram.mean() - 10.0).abs() < 1e-9);
        assert_eq!(histogram.value_at_quantile(50.0), 10);
    }
}
