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

//! Lock-free value cells backing registered counters and gauges.
//!
//! Every mutation is a single atomic read-modify-write; no operation blocks,
//! regardless of how many threads update the same cell concurrently.

use std::sync::atomic::{AtomicI64, Ordering};

/// A monotonic accumulator.
///
/// Callers must not pass negative deltas to `increment_n`; the cell does not
/// enforce this. `set_raw` exists for counts tracked externally (e.g. a
/// value scraped from another system) and overwrites the accumulator.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_n(&self, increment: i64) {
        self.value.fetch_add(increment, Ordering::Relaxed);
    }

    /// Absolute overwrite for externally tracked counts.
    pub fn set_raw(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// An arbitrary signed settable value.
///
/// `set` is last-writer-wins: no ordering is guaranteed beyond what the
/// caller's own synchronization provides.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn add(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counter_accumulates() {
        let counter = Counter::new();
        counter.increment();
        counter.increment_n(4);
        assert_eq!(counter.value(), 5);
    }

    #[test]
    fn counter_raw_set_overwrites() {
        let counter = Counter::new();
        counter.increment_n(100);
        counter.set_raw(7);
        assert_eq!(counter.value(), 7);
    }

    #[test]
    fn concurrent_increments_lose_no_updates() {
        let counter = Arc::new(Counter::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..1_000 {
                    counter.increment();
                }
                counter.increment_n(2);
            }));
        }
        for handle in handles {
            handle.join().expect("incrementing thread panicked");
        }

        assert_eq!(counter.value(), 8 * 1_000 + 8 * 2);
    }

    #[test]
    fn gauge_set_is_last_writer_wins() {
        let gauge = Gauge::new();
        gauge.set(16);
        gauge.set(-3);
        assert_eq!(gauge.value(), -3);
        gauge.add(5);
        assert_eq!(gauge.value(), 2);
    }
}
