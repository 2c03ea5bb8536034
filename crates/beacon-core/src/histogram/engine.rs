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

//! A bounded-memory recorder of integer value distributions.
//!
//! Values between a configured minimum and maximum are bucketed at a
//! configured number of significant decimal figures: each power-of-two
//! magnitude halves its bucket resolution, so memory stays fixed no matter
//! how many observations arrive. Summary statistics (min, max, mean,
//! standard deviation, total count, value-at-quantile) are computed on
//! demand from the bucket array.
//!
//! The engine itself is not thread-safe; `SyncHistogram` adds the
//! reader/writer-lock adapter used for concurrent access.

use std::fmt::{self, Display};

/// An error raised during histogram construction or recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistogramError {
    /// The configured range must satisfy `0 <= min < max`.
    InvalidRange { min: i64, max: i64 },
    /// The resolution must lie in the inclusive range `[1, 5]`.
    InvalidResolution(u32),
    /// The recorded value fell outside the configured range.
    ValueOutOfRange { value: i64, min: i64, max: i64 },
}

impl Display for HistogramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistogramError::InvalidRange { min, max } => {
                write!(f, "invalid histogram range: [{min}, {max}]")
            }
            HistogramError::InvalidResolution(resolution) => {
                write!(f, "invalid histogram resolution: {resolution} (expected 1..=5)")
            }
            HistogramError::ValueOutOfRange { value, min, max } => {
                write!(f, "value {value} outside histogram range [{min}, {max}]")
            }
        }
    }
}

impl std::error::Error for HistogramError {}

/// Fixed-precision distribution recorder over `[min, max]`.
#[derive(Debug, Clone)]
pub struct Histogram {
    min_trackable: i64,
    max_trackable: i64,
    resolution: u32,
    unit_magnitude: u32,
    sub_bucket_half_count_magnitude: u32,
    sub_bucket_half_count: usize,
    sub_bucket_mask: i64,
    counts: Vec<u64>,
    total: u64,
    sum: i64,
}

impl Histogram {
    /// Builds a recorder for values in `[min, max]` at `resolution`
    /// significant decimal figures (1 through 5).
    pub fn new(min: i64, max: i64, resolution: u32) -> Result<Self, HistogramError> {
        if min < 0 || min >= max {
            return Err(HistogramError::InvalidRange { min, max });
        }
        if !(1..=5).contains(&resolution) {
            return Err(HistogramError::InvalidResolution(resolution));
        }

        let lowest_discernible = min.max(1);
        let largest_single_unit: u64 = 2 * 10u64.pow(resolution);

        let sub_bucket_count_magnitude = 64 - (largest_single_unit - 1).leading_zeros();
        let sub_bucket_half_count_magnitude = sub_bucket_count_magnitude.max(1) - 1;
        let sub_bucket_count = 1usize << (sub_bucket_half_count_magnitude + 1);
        let sub_bucket_half_count = sub_bucket_count / 2;
        let unit_magnitude = 63 - (lowest_discernible as u64).leading_zeros();
        let sub_bucket_mask = ((sub_bucket_count - 1) as i64) << unit_magnitude;

        // Double the range covered per bucket until the configured maximum fits.
        let mut smallest_untrackable = (sub_bucket_count as i128) << unit_magnitude;
        let mut bucket_count = 1usize;
        while smallest_untrackable <= max as i128 {
            smallest_untrackable <<= 1;
            bucket_count += 1;
        }

        Ok(Self {
            min_trackable: min,
            max_trackable: max,
            resolution,
            unit_magnitude,
            sub_bucket_half_count_magnitude,
            sub_bucket_half_count,
            sub_bucket_mask,
            counts: vec![0; (bucket_count + 1) * sub_bucket_half_count],
            total: 0,
            sum: 0,
        })
    }

    /// Records one observation. Out-of-range values are rejected without
    /// touching internal state.
    pub fn record(&mut self, value: i64) -> Result<(), HistogramError> {
        if value < self.min_trackable || value > self.max_trackable {
            return Err(HistogramError::ValueOutOfRange {
                value,
                min: self.min_trackable,
                max: self.max_trackable,
            });
        }

        let index = self.counts_index_for(value);
        self.counts[index] += 1;
        self.total += 1;
        self.sum += value;
        Ok(())
    }

    /// The lower bound of the configured range.
    pub fn min_trackable(&self) -> i64 {
        self.min_trackable
    }

    /// The upper bound of the configured range.
    pub fn max_trackable(&self) -> i64 {
        self.max_trackable
    }

    /// The configured number of significant decimal figures.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Total number of recorded observations.
    pub fn total_count(&self) -> u64 {
        self.total
    }

    /// Sum of every recorded value.
    pub fn sum(&self) -> i64 {
        self.sum
    }

    /// The lowest recorded value (at bucket precision), 0 when empty.
    pub fn min(&self) -> i64 {
        match self.counts.iter().position(|&count| count > 0) {
            Some(index) => self.value_for_index(index),
            None => 0,
        }
    }

    /// The highest recorded value (at bucket precision), 0 when empty.
    pub fn max(&self) -> i64 {
        match self.counts.iter().rposition(|&count| count > 0) {
            Some(index) => self.highest_equivalent(self.value_for_index(index)),
            None => 0,
        }
    }

    /// Arithmetic mean of recorded values, 0.0 when empty.
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.sum as f64 / self.total as f64
    }

    /// Standard deviation of recorded values, 0.0 when empty.
    pub fn stddev(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        let mean = self.mean();
        let mut geometric_deviation_total = 0.0;
        for (index, &count) in self.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let deviation = self.median_equivalent(self.value_for_index(index)) as f64 - mean;
            geometric_deviation_total += deviation * deviation * count as f64;
        }
        (geometric_deviation_total / self.total as f64).sqrt()
    }

    /// The recorded value at the given quantile, with `quantile` expressed
    /// as a percentage in `[0, 100]` (out-of-range requests are clamped).
    /// Returns 0 when no values have been recorded.
    pub fn value_at_quantile(&self, quantile: f64) -> i64 {
        if self.total == 0 {
            return 0;
        }

        let quantile = quantile.clamp(0.0, 100.0);
        let target = (((quantile / 100.0) * self.total as f64) + 0.5) as u64;
        let target = target.max(1);

        let mut cumulative = 0u64;
        for (index, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return self.highest_equivalent(self.value_for_index(index));
            }
        }
        self.max()
    }

    /// Cumulative count of observations at or below `value`. Used by the
    /// exposition renderer's bucket lines.
    pub fn count_at_or_below(&self, value: i64) -> u64 {
        if self.total == 0 || value < self.min_trackable.max(0) {
            return 0;
        }
        if value >= self.max_trackable {
            return self.total;
        }

        let cap = self.counts_index_for(value.max(0));
        self.counts[..=cap].iter().sum()
    }

    /// Clears every recorded observation; the configured range survives.
    pub fn reset(&mut self) {
        self.counts.iter_mut().for_each(|count| *count = 0);
        self.total = 0;
        self.sum = 0;
    }

    fn counts_index_for(&self, value: i64) -> usize {
        let bucket_index = self.bucket_index(value);
        let sub_bucket_index = (value >> (bucket_index as u32 + self.unit_magnitude)) as usize;
        bucket_index * self.sub_bucket_half_count + sub_bucket_index
    }

    fn bucket_index(&self, value: i64) -> usize {
        let pow2_ceiling = 64 - ((value | self.sub_bucket_mask) as u64).leading_zeros();
        (pow2_ceiling - self.unit_magnitude - (self.sub_bucket_half_count_magnitude + 1)) as usize
    }

    fn value_for_index(&self, index: usize) -> i64 {
        let mut bucket_index = (index >> self.sub_bucket_half_count_magnitude) as isize - 1;
        let mut sub_bucket_index = (index & (self.sub_bucket_half_count - 1)) + self.sub_bucket_half_count;
        if bucket_index < 0 {
            sub_bucket_index -= self.sub_bucket_half_count;
            bucket_index = 0;
        }
        (sub_bucket_index as i64) << (bucket_index as u32 + self.unit_magnitude)
    }

    fn size_of_equivalent_range(&self, value: i64) -> i64 {
        1i64 << (self.unit_magnitude + self.bucket_index(value) as u32)
    }

    fn lowest_equivalent(&self, value: i64) -> i64 {
        let bucket_index = self.bucket_index(value) as u32;
        (value >> (bucket_index + self.unit_magnitude)) << (bucket_index + self.unit_magnitude)
    }

    fn highest_equivalent(&self, value: i64) -> i64 {
        self.lowest_equivalent(value) + self.size_of_equivalent_range(value) - 1
    }

    fn median_equivalent(&self, value: i64) -> i64 {
        self.lowest_equivalent(value) + (self.size_of_equivalent_range(value) >> 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(min: i64, max: i64, resolution: u32) -> Histogram {
        Histogram::new(min, max, resolution).expect("valid histogram configuration")
    }

    #[test]
    fn construction_rejects_inverted_or_negative_ranges() {
        assert_eq!(
            Histogram::new(10, 10, 3).unwrap_err(),
            HistogramError::InvalidRange { min: 10, max: 10 }
        );
        assert_eq!(
            Histogram::new(100, 1, 3).unwrap_err(),
            HistogramError::InvalidRange { min: 100, max: 1 }
        );
        assert_eq!(
            Histogram::new(-1, 100, 3).unwrap_err(),
            HistogramError::InvalidRange { min: -1, max: 100 }
        );
    }

    #[test]
    fn construction_rejects_resolution_outside_one_through_five() {
        assert_eq!(
            Histogram::new(0, 100, 0).unwrap_err(),
            HistogramError::InvalidResolution(0)
        );
        assert_eq!(
            Histogram::new(0, 100, 6).unwrap_err(),
            HistogramError::InvalidResolution(6)
        );
        assert!(Histogram::new(0, 100, 1).is_ok());
        assert!(Histogram::new(0, 100, 5).is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected_without_side_effects() {
        let mut histogram = fresh(0, 1_000, 3);
        histogram.record(500).expect("in-range value");

        let failure = histogram.record(1_001);
        assert_eq!(
            failure,
            Err(HistogramError::ValueOutOfRange { value: 1_001, min: 0, max: 1_000 })
        );
        assert_eq!(histogram.total_count(), 1);
        assert_eq!(histogram.sum(), 500);
    }

    #[test]
    fn summary_statistics_over_known_observations() {
        let mut histogram = fresh(0, 1_000, 3);
        for value in [10, 20, 30, 40] {
            histogram.record(value).expect("in-range value");
        }

        assert_eq!(histogram.total_count(), 4);
        assert_eq!(histogram.sum(), 100);
        assert_eq!(histogram.min(), 10);
        assert_eq!(histogram.max(), 40);
        assert!((histogram.mean() - 25.0).abs() < 1e-9);
        // population stddev of {10,20,30,40} around 25
        assert!((histogram.stddev() - 125.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn stddev_of_a_constant_stream_is_zero() {
        let mut histogram = fresh(0, 1_000, 3);
        for _ in 0..10 {
            histogram.record(64).expect("in-range value");
        }
        assert_eq!(histogram.stddev(), 0.0);
    }

    #[test]
    fn quantiles_walk_the_distribution() {
        let mut histogram = fresh(0, 1_000, 3);
        for value in 1..=100 {
            histogram.record(value).expect("in-range value");
        }

        assert_eq!(histogram.value_at_quantile(50.0), 50);
        assert_eq!(histogram.value_at_quantile(90.0), 90);
        assert_eq!(histogram.value_at_quantile(99.0), 99);
        assert_eq!(histogram.value_at_quantile(100.0), 100);
        // out-of-range requests clamp instead of failing
        assert_eq!(histogram.value_at_quantile(250.0), 100);
    }

    #[test]
    fn cumulative_counts_are_monotonic_across_thresholds() {
        let mut histogram = fresh(0, 1_000, 3);
        for value in [1, 2, 4, 8, 16, 32, 64, 128, 256, 512] {
            histogram.record(value).expect("in-range value");
        }

        let thresholds = [0, 1, 20, 30, 50, 100, 300, 500];
        let mut previous = 0;
        for threshold in thresholds {
            let count = histogram.count_at_or_below(threshold);
            assert!(count >= previous, "counts regressed at le={threshold}");
            previous = count;
        }
        assert_eq!(histogram.count_at_or_below(4), 3);
        assert_eq!(histogram.count_at_or_below(1_000), histogram.total_count());
    }

    #[test]
    fn empty_histogram_reads_zero_everywhere() {
        let histogram = fresh(0, 1_000, 3);
        assert_eq!(histogram.total_count(), 0);
        assert_eq!(histogram.min(), 0);
        assert_eq!(histogram.max(), 0);
        assert_eq!(histogram.mean(), 0.0);
        assert_eq!(histogram.stddev(), 0.0);
        assert_eq!(histogram.value_at_quantile(99.0), 0);
        assert_eq!(histogram.count_at_or_below(500), 0);
    }

    #[test]
    fn reset_clears_observations_but_keeps_the_range() {
        let mut histogram = fresh(0, 1_000, 3);
        histogram.record(123).expect("in-range value");
        histogram.reset();

        assert_eq!(histogram.total_count(), 0);
        assert_eq!(histogram.sum(), 0);
        assert_eq!(histogram.min_trackable(), 0);
        assert_eq!(histogram.max_trackable(), 1_000);
        histogram.record(999).expect("range survives reset");
    }

    #[test]
    fn wide_ranges_keep_values_within_resolution() {
        let mut histogram = fresh(1, 10_000_000, 2);
        for value in [1, 999, 100_000, 9_999_999] {
            histogram.record(value).expect("in-range value");
        }

        assert_eq!(histogram.total_count(), 4);
        assert_eq!(histogram.min(), 1);
        // two significant figures: the maximum is exact within 1% of the value
        let max = histogram.max();
        assert!(max >= 9_999_999 && (max - 9_999_999) as f64 / 9_999_999.0 < 0.01);
    }
}
