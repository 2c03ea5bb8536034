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

//! Foundational crate with metric contracts, atomic value cells, and the
//! histogram engine shared by the tracker and publisher crates.

pub mod cell;
pub mod histogram;
pub mod metric;
pub mod sink;

pub use cell::{Counter, Gauge};
pub use histogram::{Histogram, HistogramError, SyncHistogram};
pub use metric::{
    measurement_channel, CounterMetric, GaugeMetric, HistogramMetric, Measurement,
    MeasurementReceiver, MeasurementSender, MetricType, METRIC_CONFLICT,
};
pub use sink::{CapturedMetrics, MetricSink};
