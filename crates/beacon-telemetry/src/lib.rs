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

//! Measurement registry, per-frequency snapshot scheduling, and plaintext
//! exposition rendering.
//!
//! Applications register metrics at startup, call `start_measuring` once
//! wiring is complete, and update handles from any thread. Snapshots flow
//! either to a pull-based `TextExporter` or, per reporting frequency, onto
//! a channel destination for push delivery.

pub mod alerting;
pub mod exporter;
pub mod global;
pub mod tracker;

pub use exporter::{TextExporter, CONTENT_TYPE};
pub use tracker::MetricsTracker;
