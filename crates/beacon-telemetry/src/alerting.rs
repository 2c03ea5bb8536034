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

//! Counter-backed severity monitoring.

use beacon_core::metric::CounterMetric;
use beacon_core::sink::MetricSink;
use std::fmt::{self, Display};
use std::sync::Arc;

/// How bad an observed event was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Anomaly,
    Failure,
    Disaster,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Anomaly => write!(f, "Anomaly"),
            Severity::Failure => write!(f, "Failure"),
            Severity::Disaster => write!(f, "Disaster"),
        }
    }
}

/// Receives severity events from application code.
pub trait Monitor: Send + Sync {
    fn observe(&self, event: Severity);
}

/// A monitor that counts each severity on a metric sink.
pub struct MetricsMonitor<S: MetricSink> {
    sink: Arc<S>,
    anomalies: CounterMetric,
    failures: CounterMetric,
    disasters: CounterMetric,
}

impl<S: MetricSink> MetricsMonitor<S> {
    pub fn new(
        sink: Arc<S>,
        anomalies: CounterMetric,
        failures: CounterMetric,
        disasters: CounterMetric,
    ) -> Self {
        Self {
            sink,
            anomalies,
            failures,
            disasters,
        }
    }
}

impl<S: MetricSink> Monitor for MetricsMonitor<S> {
    fn observe(&self, event: Severity) {
        let counted = match event {
            Severity::Anomaly => self.sink.count(self.anomalies),
            Severity::Failure => self.sink.count(self.failures),
            Severity::Disaster => self.sink.count(self.disasters),
        };
        if !counted {
            log::warn!("unable to count {event} event: unknown counter handle");
        }
    }
}
