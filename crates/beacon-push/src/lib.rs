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

//! Batched, backpressure-aware HTTP publishing of measurement snapshots.
//!
//! Snapshots produced by the tracker's per-frequency reporters arrive over
//! a bounded channel, merge into a last-value-wins buffer, and ship to a
//! remote time-series backend in bounded batches over a bounded number of
//! concurrent lanes. Delivery is best-effort: failed batches are logged and
//! dropped, and the next snapshot cycle re-attempts what remains buffered.

pub mod appoptics;
pub mod config;
pub mod librato;
pub mod pipeline;
pub mod publisher;

pub use appoptics::{AppOpticsBackend, APPOPTICS_URL};
pub use config::{AppOpticsConfig, ConfigError, LibratoConfig, PushPipelineOptions};
pub use librato::{LibratoBackend, LIBRATO_URL};
pub use pipeline::{start_appoptics, start_librato, start_with_backend, PushPipeline};
pub use publisher::{
    batches_required, BatchPublisher, PublishError, PushBackend, MAX_ITEMS_PER_BATCH,
};
