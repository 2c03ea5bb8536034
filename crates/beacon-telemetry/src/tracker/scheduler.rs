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

//! Per-frequency snapshot reporters.
//!
//! Metrics sharing one reporting frequency share one repeating-interval
//! task. Each tick snapshots the bucket and forwards the batch to the
//! registered destination. Missed ticks delay rather than burst, so drift
//! accumulates exactly like a timer that re-arms itself after firing. The
//! whole task set is cancelled as a unit by `stop_measuring`.

use super::TrackerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub(crate) fn spawn_reporter(
    state: Arc<TrackerState>,
    frequency: Duration,
    indices: Vec<usize>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(frequency);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately; the cadence starts one
        // full interval after start_measuring
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !state.is_started() {
                break;
            }

            let batch = state.snapshot_indices(&indices);
            if batch.is_empty() {
                continue;
            }
            let Some(destination) = state.destination() else {
                continue;
            };
            if destination.send_async(batch).await.is_err() {
                log::warn!(
                    "measurement destination disconnected; reporter for {frequency:?} stopping"
                );
                break;
            }
        }
    })
}
