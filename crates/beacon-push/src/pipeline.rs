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

//! Bootstrap wiring: tracker -> bounded snapshot channel -> publisher task.

use crate::appoptics::AppOpticsBackend;
use crate::config::{AppOpticsConfig, ConfigError, LibratoConfig, PushPipelineOptions};
use crate::librato::LibratoBackend;
use crate::publisher::{BatchPublisher, PushBackend};
use beacon_core::metric::measurement_channel;
use beacon_telemetry::MetricsTracker;
use tokio::task::JoinHandle;

/// Owns the running publisher task.
#[derive(Debug)]
pub struct PushPipeline {
    task: JoinHandle<()>,
}

impl PushPipeline {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the publisher. Buffered-but-undelivered measurements are
    /// dropped; in-flight requests run to their client timeout.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Starts the JSON-batch push pipeline against the given tracker.
pub fn start_appoptics(
    tracker: &MetricsTracker,
    config: AppOpticsConfig,
    options: PushPipelineOptions,
) -> Result<PushPipeline, ConfigError> {
    let backend = AppOpticsBackend::new(config)?;
    start_with_backend(tracker, backend, options)
}

/// Starts the form-encoded push pipeline against the given tracker.
pub fn start_librato(
    tracker: &MetricsTracker,
    config: LibratoConfig,
    options: PushPipelineOptions,
) -> Result<PushPipeline, ConfigError> {
    let backend = LibratoBackend::new(config)?;
    start_with_backend(tracker, backend, options)
}

/// Wires any backend into the tracker: validates the options once, creates
/// the bounded snapshot channel, registers it as the tracker destination,
/// and spawns the publisher. Requires a running Tokio runtime.
pub fn start_with_backend<B: PushBackend>(
    tracker: &MetricsTracker,
    backend: B,
    options: PushPipelineOptions,
) -> Result<PushPipeline, ConfigError> {
    options.validate()?;

    let (sender, receiver) = measurement_channel(options.queue_capacity);
    tracker.set_destination(sender);

    let publisher = BatchPublisher::new(backend, options.max_lanes);
    Ok(PushPipeline {
        task: tokio::spawn(publisher.run(receiver)),
    })
}
