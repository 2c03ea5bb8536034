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

//! Batched, lane-bounded delivery of measurement snapshots.
//!
//! The publisher decouples snapshot production from outbound HTTP: incoming
//! batches merge into a per-metric buffer (last value wins), and whenever
//! the inbound queue drains empty the buffer is carved into batches and
//! dispatched fire-and-forget. A semaphore of "lanes" caps in-flight
//! requests; when no lane is free the remainder stays buffered for the
//! next trigger. Failed deliveries are logged and dropped — the next
//! snapshot cycle re-attempts whatever is still buffered.

use async_trait::async_trait;
use beacon_core::metric::{Measurement, MeasurementReceiver};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Ceiling on items per outbound request, bounding payload size.
pub const MAX_ITEMS_PER_BATCH: usize = 256;

/// A failed delivery attempt. Never retried within the same cycle.
#[derive(Debug)]
pub enum PublishError {
    /// The request could not be completed.
    Http(reqwest::Error),
    /// The backend answered outside the 2xx range.
    Status { code: u16, body: String },
    /// The batch could not be serialized into a request body.
    Body(serde_json::Error),
}

impl Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Http(error) => write!(f, "http request failed: {error}"),
            PublishError::Status { code, body } => {
                write!(f, "backend responded {code}: {body}")
            }
            PublishError::Body(error) => write!(f, "unable to serialize batch: {error}"),
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublishError::Http(error) => Some(error),
            PublishError::Body(error) => Some(error),
            PublishError::Status { .. } => None,
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(error: reqwest::Error) -> Self {
        PublishError::Http(error)
    }
}

/// Serializes one batch into a backend-specific request and delivers it.
#[async_trait]
pub trait PushBackend: Send + Sync + 'static {
    async fn deliver(&self, batch: Vec<Measurement>) -> Result<(), PublishError>;
}

/// Buffers snapshots and ships them through a bounded set of lanes.
pub struct BatchPublisher<B: PushBackend> {
    backend: Arc<B>,
    lanes: Arc<Semaphore>,
    max_lanes: usize,
    buffer: HashMap<i64, Measurement>,
}

impl<B: PushBackend> BatchPublisher<B> {
    pub fn new(backend: B, max_lanes: usize) -> Self {
        Self {
            backend: Arc::new(backend),
            lanes: Arc::new(Semaphore::new(max_lanes)),
            max_lanes,
            buffer: HashMap::new(),
        }
    }

    /// Consumes snapshot batches until the inbound channel closes,
    /// publishing whenever the channel drains empty.
    pub async fn run(mut self, queue: MeasurementReceiver) {
        while let Ok(snapshot) = queue.recv_async().await {
            for measurement in snapshot {
                // last value wins per metric identifier
                self.buffer.insert(measurement.id, measurement);
            }
            if queue.is_empty() {
                self.publish();
            }
        }
        log::info!("measurement queue closed; publisher stopping");
    }

    fn publish(&mut self) {
        loop {
            if self.buffer.is_empty() {
                break;
            }

            let available = self.lanes.available_permits();
            if available == 0 {
                log::info!("skipping publish: no open lanes (max {})", self.max_lanes);
                break;
            }

            let needed = batches_required(self.buffer.len());
            if needed > available {
                log::info!(
                    "truncating publish: {needed} batches needed, {available} lanes available"
                );
            }

            for _ in 0..needed.min(available) {
                // only this loop consumes permits, so the acquire cannot fail
                let Ok(permit) = Arc::clone(&self.lanes).try_acquire_owned() else {
                    break;
                };
                let batch = self.drain_batch();
                let backend = Arc::clone(&self.backend);
                tokio::spawn(async move {
                    if let Err(error) = backend.deliver(batch).await {
                        log::warn!("unable to complete publish request: {error}");
                    }
                    drop(permit);
                });
            }
        }
    }

    fn drain_batch(&mut self) -> Vec<Measurement> {
        let keys: Vec<i64> = self
            .buffer
            .keys()
            .take(MAX_ITEMS_PER_BATCH)
            .copied()
            .collect();
        keys.iter().filter_map(|key| self.buffer.remove(key)).collect()
    }
}

/// Requests needed to carry `item_count` buffered measurements.
pub fn batches_required(item_count: usize) -> usize {
    item_count.div_ceil(MAX_ITEMS_PER_BATCH)
}
