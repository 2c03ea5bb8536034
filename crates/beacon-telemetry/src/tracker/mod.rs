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

//! The measurement registry.
//!
//! A `MetricsTracker` owns every registered metric, enforces name
//! uniqueness and the add/start state machine, applies tags, and produces
//! `Measurement` snapshots either on demand (`take_measurements`) or on a
//! per-frequency schedule forwarded to a registered channel destination.

pub(crate) mod scheduler;

use beacon_core::cell::{Counter, Gauge};
use beacon_core::histogram::SyncHistogram;
use beacon_core::metric::{
    CounterMetric, GaugeMetric, HistogramMetric, Measurement, MeasurementSender, MetricType,
    METRIC_CONFLICT,
};
use beacon_core::sink::MetricSink;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant, SystemTime};
use tokio::task::JoinHandle;

/// Derived summary statistics registered alongside each histogram, each
/// reported as a gauge-typed measurement.
#[derive(Debug, Clone, Copy)]
pub(crate) enum HistogramStat {
    Min,
    Max,
    Mean,
    StdDev,
    TotalCount,
    Quantile(f64),
}

impl HistogramStat {
    fn read(&self, engine: &SyncHistogram) -> i64 {
        match self {
            HistogramStat::Min => engine.min(),
            HistogramStat::Max => engine.max(),
            HistogramStat::Mean => engine.mean() as i64,
            HistogramStat::StdDev => engine.stddev() as i64,
            HistogramStat::TotalCount => engine.total_count() as i64,
            HistogramStat::Quantile(quantile) => engine.value_at_quantile(*quantile),
        }
    }
}

/// The value storage behind one registered metric, a closed variant per kind.
#[derive(Debug)]
pub(crate) enum MetricKind {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    Histogram {
        engine: Arc<SyncHistogram>,
        /// Exposition bucket thresholds, ascending.
        buckets: Vec<i64>,
    },
    HistogramStat {
        engine: Arc<SyncHistogram>,
        stat: HistogramStat,
        /// Registry slot of the owning histogram; tags resolve through it.
        parent: usize,
    },
}

#[derive(Debug)]
pub(crate) struct MetricEntry {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) metric_type: MetricType,
    pub(crate) frequency: Duration,
    /// Next pull-snapshot instant, in microseconds since the tracker epoch.
    pub(crate) upcoming_us: u64,
    pub(crate) tags: Vec<(String, String)>,
    pub(crate) kind: MetricKind,
}

#[derive(Debug)]
pub(crate) struct TrackerState {
    pub(crate) entries: RwLock<Vec<MetricEntry>>,
    started: AtomicBool,
    epoch: Instant,
    destination: RwLock<Option<MeasurementSender>>,
}

impl TrackerState {
    pub(crate) fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub(crate) fn entries(&self) -> RwLockReadGuard<'_, Vec<MetricEntry>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entries_mut(&self) -> RwLockWriteGuard<'_, Vec<MetricEntry>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn destination(&self) -> Option<MeasurementSender> {
        self.destination
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Snapshots the given registry slots without rescheduling; the
    /// per-frequency reporters own their own cadence.
    pub(crate) fn snapshot_indices(&self, indices: &[usize]) -> Vec<Measurement> {
        let captured = SystemTime::now();
        let entries = self.entries();
        indices
            .iter()
            .filter_map(|&index| measurement_for(&entries, index, captured))
            .collect()
    }
}

/// The measurement registry. Cheap to clone; every clone shares state.
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    pub(crate) state: Arc<TrackerState>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(TrackerState {
                entries: RwLock::new(Vec::new()),
                started: AtomicBool::new(false),
                epoch: Instant::now(),
                destination: RwLock::new(None),
            }),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Registers a counter reporting at `frequency`.
    /// Returns the conflict sentinel on failure (see `add_entry` rules).
    pub fn add_counter(&self, name: &str, frequency: Duration) -> CounterMetric {
        self.add_counter_described(name, "", frequency)
    }

    pub fn add_counter_described(
        &self,
        name: &str,
        description: &str,
        frequency: Duration,
    ) -> CounterMetric {
        CounterMetric::new(self.add_entry(
            name,
            description,
            MetricType::Counter,
            frequency,
            MetricKind::Counter(Arc::new(Counter::new())),
        ))
    }

    /// Registers a gauge reporting at `frequency`.
    pub fn add_gauge(&self, name: &str, frequency: Duration) -> GaugeMetric {
        self.add_gauge_described(name, "", frequency)
    }

    pub fn add_gauge_described(
        &self,
        name: &str,
        description: &str,
        frequency: Duration,
    ) -> GaugeMetric {
        GaugeMetric::new(self.add_entry(
            name,
            description,
            MetricType::Gauge,
            frequency,
            MetricKind::Gauge(Arc::new(Gauge::new())),
        ))
    }

    /// Registers a histogram over `[min, max]` at `resolution` significant
    /// figures, plus one derived gauge-typed entry per summary statistic
    /// (`_min`, `_max`, `_mean`, `_stddev`, `_total`, and each requested
    /// quantile), all sharing `frequency` and the histogram's tag set.
    pub fn add_histogram(
        &self,
        name: &str,
        frequency: Duration,
        min: i64,
        max: i64,
        resolution: u32,
        quantiles: &[f64],
    ) -> HistogramMetric {
        self.add_histogram_described(name, "", frequency, min, max, resolution, quantiles)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_histogram_described(
        &self,
        name: &str,
        description: &str,
        frequency: Duration,
        min: i64,
        max: i64,
        resolution: u32,
        quantiles: &[f64],
    ) -> HistogramMetric {
        if self.state.is_started() {
            log::warn!("rejecting late registration of {name:?}: tracker already started");
            return HistogramMetric::CONFLICT;
        }
        let name = name.trim();
        if name.is_empty() || frequency.is_zero() {
            return HistogramMetric::CONFLICT;
        }
        if quantiles.iter().any(|q| !(0.0..=100.0).contains(q)) {
            log::warn!("rejecting histogram {name:?}: quantiles must lie in [0, 100]");
            return HistogramMetric::CONFLICT;
        }

        let engine = match SyncHistogram::with_range(min, max, resolution) {
            Ok(engine) => Arc::new(engine),
            Err(error) => {
                log::warn!("rejecting histogram {name:?}: {error}");
                return HistogramMetric::CONFLICT;
            }
        };

        let mut derived: Vec<(String, HistogramStat)> = vec![
            (format!("{name}_min"), HistogramStat::Min),
            (format!("{name}_max"), HistogramStat::Max),
            (format!("{name}_mean"), HistogramStat::Mean),
            (format!("{name}_stddev"), HistogramStat::StdDev),
            (format!("{name}_total"), HistogramStat::TotalCount),
        ];
        for &quantile in quantiles {
            derived.push((
                format!("{name}_{quantile:.3}"),
                HistogramStat::Quantile(quantile),
            ));
        }

        let mut entries = self.state.entries_mut();

        let mut requested: HashSet<&str> = HashSet::with_capacity(derived.len() + 1);
        requested.insert(name);
        let clashes = derived
            .iter()
            .any(|(derived_name, _)| !requested.insert(derived_name.as_str()));
        if clashes
            || entries
                .iter()
                .any(|entry| requested.contains(entry.name.as_str()))
        {
            return HistogramMetric::CONFLICT;
        }

        let parent = entries.len();
        entries.push(MetricEntry {
            name: name.to_string(),
            description: description.to_string(),
            metric_type: MetricType::Histogram,
            frequency,
            upcoming_us: 0,
            tags: Vec::new(),
            kind: MetricKind::Histogram {
                engine: Arc::clone(&engine),
                buckets: default_buckets(min, max),
            },
        });
        for (derived_name, stat) in derived {
            entries.push(MetricEntry {
                name: derived_name,
                description: String::new(),
                metric_type: MetricType::Gauge,
                frequency,
                upcoming_us: 0,
                tags: Vec::new(),
                kind: MetricKind::HistogramStat {
                    engine: Arc::clone(&engine),
                    stat,
                    parent,
                },
            });
        }

        HistogramMetric::new(parent as i64)
    }

    fn add_entry(
        &self,
        name: &str,
        description: &str,
        metric_type: MetricType,
        frequency: Duration,
        kind: MetricKind,
    ) -> i64 {
        if self.state.is_started() {
            log::warn!("rejecting late registration of {name:?}: tracker already started");
            return METRIC_CONFLICT;
        }
        let name = name.trim();
        if name.is_empty() || frequency.is_zero() {
            return METRIC_CONFLICT;
        }

        let mut entries = self.state.entries_mut();
        if entries.iter().any(|entry| entry.name == name) {
            return METRIC_CONFLICT;
        }

        entries.push(MetricEntry {
            name: name.to_string(),
            description: description.to_string(),
            metric_type,
            frequency,
            upcoming_us: 0,
            tags: Vec::new(),
            kind,
        });
        (entries.len() - 1) as i64
    }

    /// Overrides the exposition bucket thresholds for a histogram.
    pub fn set_histogram_buckets(&self, id: HistogramMetric, thresholds: &[i64]) {
        let Some(index) = id.index() else { return };
        let mut entries = self.state.entries_mut();
        match entries.get_mut(index).map(|entry| &mut entry.kind) {
            Some(MetricKind::Histogram { buckets, .. }) => {
                let mut thresholds = thresholds.to_vec();
                thresholds.sort_unstable();
                thresholds.dedup();
                *buckets = thresholds;
            }
            _ => log::warn!("ignoring bucket override: {index} is not a histogram"),
        }
    }

    /// Attaches key/value tag pairs to a counter. An odd number of tokens
    /// is rejected with a warning and applies nothing.
    pub fn tag_counter(&self, id: CounterMetric, tags: &[&str]) {
        self.tag_index(id.index(), tags);
    }

    /// Attaches key/value tag pairs to a gauge.
    pub fn tag_gauge(&self, id: GaugeMetric, tags: &[&str]) {
        self.tag_index(id.index(), tags);
    }

    /// Attaches key/value tag pairs to a histogram; its derived stat
    /// entries resolve tags through the histogram, so they inherit these.
    pub fn tag_histogram(&self, id: HistogramMetric, tags: &[&str]) {
        self.tag_index(id.index(), tags);
    }

    /// Attaches key/value tag pairs to every registered metric.
    pub fn tag_all(&self, tags: &[&str]) {
        let Some(pairs) = parse_tags(tags) else { return };
        let mut entries = self.state.entries_mut();
        for entry in entries.iter_mut() {
            // Derived stats inherit their parent's tags; tagging them
            // directly would double every pair.
            if !matches!(entry.kind, MetricKind::HistogramStat { .. }) {
                entry.tags.extend(pairs.iter().cloned());
            }
        }
    }

    fn tag_index(&self, index: Option<usize>, tags: &[&str]) {
        let Some(pairs) = parse_tags(tags) else { return };
        let Some(index) = index else { return };
        let mut entries = self.state.entries_mut();
        if let Some(entry) = entries.get_mut(index) {
            entry.tags.extend(pairs);
        }
    }

    /// Signals that registration is complete and turns measurement tracking
    /// on: one self-rescheduling reporter task is spawned per distinct
    /// reporting frequency. Idempotent; requires a running Tokio runtime.
    pub fn start_measuring(&self) {
        if self.state.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut groups: BTreeMap<Duration, Vec<usize>> = BTreeMap::new();
        for (index, entry) in self.state.entries().iter().enumerate() {
            groups.entry(entry.frequency).or_default().push(index);
        }

        let mut tasks = lock(&self.tasks);
        for (frequency, indices) in groups {
            tasks.push(scheduler::spawn_reporter(
                Arc::clone(&self.state),
                frequency,
                indices,
            ));
        }
    }

    /// Turns measurement tracking off and cancels the reporter tasks as a
    /// unit. Already-dispatched batches are not recalled. Idempotent.
    pub fn stop_measuring(&self) {
        if !self.state.started.swap(false, Ordering::SeqCst) {
            return;
        }
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
    }

    /// Registers the channel that scheduled snapshots are forwarded to.
    pub fn set_destination(&self, sender: MeasurementSender) {
        *self
            .state
            .destination
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(sender);
    }

    /// Pull-based snapshot: emits a Measurement for every metric whose next
    /// scheduled instant has elapsed and reschedules it at `now + frequency`.
    /// Returns nothing while the tracker is not started.
    pub fn take_measurements(&self, now: Instant) -> Vec<Measurement> {
        if !self.state.is_started() {
            return Vec::new();
        }

        let now_us = now.saturating_duration_since(self.state.epoch).as_micros() as u64;
        let captured = SystemTime::now();
        let mut entries = self.state.entries_mut();

        let due: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| now_us >= entry.upcoming_us)
            .map(|(index, _)| index)
            .collect();

        let measurements = due
            .iter()
            .filter_map(|&index| measurement_for(&entries, index, captured))
            .collect();

        for &index in &due {
            let frequency_us = entries[index].frequency.as_micros() as u64;
            entries[index].upcoming_us = now_us + frequency_us;
        }
        measurements
    }

    /// Number of registry slots, derived stat entries included.
    pub fn metric_count(&self) -> usize {
        self.state.entries().len()
    }

    /// True while the tracker is in the started state.
    pub fn is_measuring(&self) -> bool {
        self.state.is_started()
    }
}

impl MetricSink for MetricsTracker {
    fn count_n(&self, id: CounterMetric, increment: i64) -> bool {
        let Some(index) = id.index() else { return false };
        let entries = self.state.entries();
        match entries.get(index).map(|entry| &entry.kind) {
            Some(MetricKind::Counter(cell)) => {
                cell.increment_n(increment);
                true
            }
            _ => false,
        }
    }

    fn raw_count(&self, id: CounterMetric, value: i64) -> bool {
        let Some(index) = id.index() else { return false };
        let entries = self.state.entries();
        match entries.get(index).map(|entry| &entry.kind) {
            Some(MetricKind::Counter(cell)) => {
                cell.set_raw(value);
                true
            }
            _ => false,
        }
    }

    fn measure(&self, id: GaugeMetric, value: i64) -> bool {
        let Some(index) = id.index() else { return false };
        let entries = self.state.entries();
        match entries.get(index).map(|entry| &entry.kind) {
            Some(MetricKind::Gauge(cell)) => {
                cell.set(value);
                true
            }
            _ => false,
        }
    }

    fn record(&self, id: HistogramMetric, value: i64) -> bool {
        let Some(index) = id.index() else { return false };
        let entries = self.state.entries();
        match entries.get(index).map(|entry| &entry.kind) {
            Some(MetricKind::Histogram { engine, .. }) => engine.record(value).is_ok(),
            _ => false,
        }
    }
}

fn measurement_for(
    entries: &[MetricEntry],
    index: usize,
    captured: SystemTime,
) -> Option<Measurement> {
    let entry = entries.get(index)?;
    let value = match &entry.kind {
        MetricKind::Counter(cell) => cell.value(),
        MetricKind::Gauge(cell) => cell.value(),
        // A histogram has no single value; its derived stat entries carry
        // the data downstream.
        MetricKind::Histogram { .. } => return None,
        MetricKind::HistogramStat { engine, stat, .. } => stat.read(engine),
    };
    let tags = match &entry.kind {
        MetricKind::HistogramStat { parent, .. } => entries
            .get(*parent)
            .map(|owner| owner.tags.clone())
            .unwrap_or_default(),
        _ => entry.tags.clone(),
    };

    Some(Measurement {
        id: index as i64,
        name: entry.name.clone(),
        captured,
        value,
        metric_type: entry.metric_type,
        tags,
    })
}

fn parse_tags(tags: &[&str]) -> Option<Vec<(String, String)>> {
    if tags.len() % 2 != 0 {
        log::warn!("ignoring tags: odd number of key/value tokens ({})", tags.len());
        return None;
    }
    Some(
        tags.chunks(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect(),
    )
}

/// Ten log-spaced exposition thresholds over the histogram range.
fn default_buckets(min: i64, max: i64) -> Vec<i64> {
    const STEPS: usize = 10;
    let lower = min.max(1) as f64;
    let upper = max as f64;
    let ratio = (upper / lower).powf(1.0 / (STEPS - 1) as f64);

    let mut edge = lower;
    let mut buckets: Vec<i64> = Vec::with_capacity(STEPS);
    for _ in 0..STEPS {
        buckets.push(edge.round() as i64);
        edge *= ratio;
    }
    buckets.dedup();
    if let Some(last) = buckets.last_mut() {
        *last = max;
    }
    buckets
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::metric::measurement_channel;
    use std::time::Duration;

    const FREQUENCY: Duration = Duration::from_millis(1);

    #[test]
    fn registering_a_duplicate_name_yields_conflict() {
        let tracker = MetricsTracker::new();

        assert_eq!(tracker.add_counter("a", FREQUENCY).raw(), 0);
        assert_eq!(tracker.add_counter("b", FREQUENCY).raw(), 1);
        assert!(tracker.add_counter("a", FREQUENCY).is_conflict());
        // names are trimmed before the uniqueness check
        assert!(tracker.add_gauge(" a ", FREQUENCY).is_conflict());
    }

    #[test]
    fn blank_names_and_zero_frequencies_are_rejected() {
        let tracker = MetricsTracker::new();

        assert!(tracker.add_counter("", FREQUENCY).is_conflict());
        assert!(tracker.add_counter("   ", FREQUENCY).is_conflict());
        assert!(tracker.add_gauge("g", Duration::ZERO).is_conflict());
        assert!(tracker
            .add_histogram("h", Duration::ZERO, 0, 100, 3, &[])
            .is_conflict());
    }

    #[test]
    fn histogram_range_and_resolution_are_validated() {
        let tracker = MetricsTracker::new();

        assert!(tracker.add_histogram("h1", FREQUENCY, 100, 100, 3, &[]).is_conflict());
        assert!(tracker.add_histogram("h2", FREQUENCY, 200, 100, 3, &[]).is_conflict());
        assert!(tracker.add_histogram("h3", FREQUENCY, 0, 100, 0, &[]).is_conflict());
        assert!(tracker.add_histogram("h4", FREQUENCY, 0, 100, 6, &[]).is_conflict());
        assert!(tracker.add_histogram("h5", FREQUENCY, 0, 100, 3, &[150.0]).is_conflict());
        assert!(!tracker.add_histogram("h6", FREQUENCY, 0, 100, 3, &[50.0]).is_conflict());
    }

    #[test]
    fn histogram_registration_adds_derived_stat_entries() {
        let tracker = MetricsTracker::new();

        let histogram = tracker.add_histogram("h", FREQUENCY, 0, 1_000, 3, &[50.0, 99.9]);
        assert_eq!(histogram.raw(), 0);
        // primary + min/max/mean/stddev/total + two quantiles
        assert_eq!(tracker.metric_count(), 8);
    }

    #[test]
    fn updates_fail_for_unknown_or_mismatched_handles() {
        let tracker = MetricsTracker::new();
        let counter = tracker.add_counter("c", FREQUENCY);
        let gauge = tracker.add_gauge("g", FREQUENCY);

        assert!(!tracker.count(CounterMetric::CONFLICT));
        assert!(!tracker.count(CounterMetric::new(99)));
        // the gauge slot is not a counter
        assert!(!tracker.count(CounterMetric::new(gauge.raw())));
        assert!(!tracker.measure(GaugeMetric::new(counter.raw()), 1));
    }

    #[test]
    fn counting_and_measuring_accumulate() {
        let tracker = MetricsTracker::new();
        let counter = tracker.add_counter("c", FREQUENCY);
        let gauge = tracker.add_gauge("g", FREQUENCY);

        for _ in 0..5 {
            assert!(tracker.count(counter));
        }
        assert!(tracker.count_n(counter, 10));
        assert!(tracker.measure(gauge, 16));
        assert!(tracker.raw_count(counter, 42));

        let histogram = tracker.add_histogram("h", FREQUENCY, 0, 100, 3, &[]);
        assert!(tracker.record(histogram, 50));
        assert!(!tracker.record(histogram, 101));
    }

    #[test]
    fn snapshots_are_empty_until_started() {
        let tracker = MetricsTracker::new();
        let counter = tracker.add_counter("c", FREQUENCY);
        tracker.count(counter);

        assert!(tracker.take_measurements(Instant::now()).is_empty());
    }

    #[tokio::test]
    async fn pull_snapshots_capture_due_metrics() {
        let tracker = MetricsTracker::new();
        let counter = tracker.add_counter("a", Duration::from_millis(1));
        let gauge = tracker.add_gauge("b", Duration::from_millis(2));

        for _ in 0..5 {
            tracker.count(counter);
        }
        tracker.measure(gauge, 16);
        tracker.start_measuring();

        let first = tracker.take_measurements(Instant::now());
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id, 0);
        assert_eq!(first[0].value, 5);
        assert_eq!(first[0].metric_type, MetricType::Counter);
        assert_eq!(first[1].id, 1);
        assert_eq!(first[1].value, 16);
        assert_eq!(first[1].metric_type, MetricType::Gauge);
        assert!(first[0].captured <= first[1].captured);

        // nothing is due again until the reporting frequency elapses
        assert!(tracker.take_measurements(Instant::now()).is_empty());

        tokio::time::sleep(Duration::from_millis(3)).await;
        let second = tracker.take_measurements(Instant::now());
        assert_eq!(second.len(), 2);

        tracker.stop_measuring();
    }

    #[tokio::test]
    async fn derived_stats_report_gauge_measurements() {
        let tracker = MetricsTracker::new();
        let histogram = tracker.add_histogram("h", FREQUENCY, 0, 1_000, 3, &[50.0]);
        for value in 1..=100 {
            tracker.record(histogram, value);
        }
        tracker.start_measuring();

        let measurements = tracker.take_measurements(Instant::now());
        tracker.stop_measuring();

        // the histogram slot itself emits nothing
        assert!(measurements.iter().all(|m| m.id != histogram.raw()));
        let by_name = |suffix: &str| {
            measurements
                .iter()
                .find(|m| m.name == format!("h{suffix}"))
                .unwrap_or_else(|| panic!("missing derived stat h{suffix}"))
        };

        assert_eq!(by_name("_min").value, 1);
        assert_eq!(by_name("_max").value, 100);
        assert_eq!(by_name("_mean").value, 50);
        assert_eq!(by_name("_stddev").value, 28);
        assert_eq!(by_name("_total").value, 100);
        assert_eq!(by_name("_50.000").value, 50);
        assert!(measurements.iter().all(|m| m.metric_type == MetricType::Gauge));
    }

    #[tokio::test]
    async fn registration_is_gated_while_started() {
        let tracker = MetricsTracker::new();
        let early = tracker.add_counter("early", FREQUENCY);

        tracker.start_measuring();
        assert!(tracker.add_counter("late", FREQUENCY).is_conflict());
        assert!(tracker.add_gauge("late-gauge", FREQUENCY).is_conflict());
        assert!(tracker
            .add_histogram("late-histogram", FREQUENCY, 0, 100, 3, &[])
            .is_conflict());
        // updates to existing metrics still apply
        assert!(tracker.count(early));

        tracker.stop_measuring();
        assert!(!tracker.add_counter("late", FREQUENCY).is_conflict());
    }

    #[tokio::test]
    async fn scheduler_forwards_batches_to_the_destination() {
        let _ = env_logger::builder().is_test(true).try_init();

        let tracker = MetricsTracker::new();
        let (sender, receiver) = measurement_channel(16);
        tracker.set_destination(sender);

        let counter = tracker.add_counter("scheduled", Duration::from_millis(10));
        for _ in 0..3 {
            tracker.count(counter);
        }
        tracker.start_measuring();

        let batch = tokio::time::timeout(Duration::from_millis(500), receiver.recv_async())
            .await
            .expect("reporter never fired")
            .expect("reporter channel closed");
        tracker.stop_measuring();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].name, "scheduled");
        assert_eq!(batch[0].value, 3);
    }

    #[tokio::test]
    async fn repeated_start_spawns_a_single_timer_set() {
        let tracker = MetricsTracker::new();
        let (sender, receiver) = measurement_channel(64);
        tracker.set_destination(sender);

        let counter = tracker.add_counter("once", Duration::from_millis(20));
        tracker.count(counter);
        tracker.start_measuring();
        tracker.start_measuring();

        tokio::time::sleep(Duration::from_millis(110)).await;
        tracker.stop_measuring();
        tokio::time::sleep(Duration::from_millis(40)).await;

        // ~5 intervals elapsed; duplicated timers would double this
        let batches = receiver.drain().count();
        assert!(batches >= 2, "expected at least two scheduled batches, saw {batches}");
        assert!(batches <= 7, "expected one timer set, saw {batches} batches");

        // stopping cancelled the reporters; nothing else arrives
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(receiver.drain().count(), 0);
    }

    #[test]
    fn odd_tag_tokens_are_ignored() {
        let tracker = MetricsTracker::new();
        let counter = tracker.add_counter("c", FREQUENCY);
        tracker.tag_counter(counter, &["color", "blue", "orphan"]);

        let entries = tracker.state.entries();
        assert!(entries[0].tags.is_empty());
    }

    #[tokio::test]
    async fn tags_flow_into_measurements() {
        let tracker = MetricsTracker::new();
        let counter = tracker.add_counter("c", FREQUENCY);
        let histogram = tracker.add_histogram("h", FREQUENCY, 0, 100, 3, &[]);

        tracker.tag_counter(counter, &["color", "blue"]);
        tracker.tag_histogram(histogram, &["region", "east"]);
        tracker.tag_all(&["service", "api"]);
        tracker.record(histogram, 10);
        tracker.start_measuring();

        let measurements = tracker.take_measurements(Instant::now());
        tracker.stop_measuring();

        let counter_measurement = measurements.iter().find(|m| m.name == "c").expect("counter");
        assert!(counter_measurement
            .tags
            .contains(&("color".to_string(), "blue".to_string())));
        assert!(counter_measurement
            .tags
            .contains(&("service".to_string(), "api".to_string())));

        // derived stats resolve tags through their owning histogram
        let stat = measurements.iter().find(|m| m.name == "h_min").expect("stat");
        assert!(stat.tags.contains(&("region".to_string(), "east".to_string())));
        assert!(stat.tags.contains(&("service".to_string(), "api".to_string())));
    }
}
