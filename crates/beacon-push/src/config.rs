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

//! Push-pipeline configuration, validated once at backend startup.

use std::fmt::{self, Display};
use std::time::Duration;

/// A configuration problem that prevents the push backend from starting.
/// Reported once at setup time and never retried.
#[derive(Debug)]
pub enum ConfigError {
    /// A required credential was missing or blank.
    MissingCredential(&'static str),
    /// The snapshot queue must hold at least one batch.
    InvalidQueueCapacity(usize),
    /// At least one concurrent lane is required.
    InvalidLaneCount(usize),
    /// The HTTP client could not be constructed.
    Client(reqwest::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingCredential(which) => {
                write!(f, "missing push backend credential: {which}")
            }
            ConfigError::InvalidQueueCapacity(capacity) => {
                write!(f, "invalid snapshot queue capacity: {capacity}")
            }
            ConfigError::InvalidLaneCount(lanes) => {
                write!(f, "invalid concurrent lane count: {lanes}")
            }
            ConfigError::Client(error) => write!(f, "unable to build http client: {error}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Client(error) => Some(error),
            _ => None,
        }
    }
}

/// Credentials and source naming for the JSON-batch backend.
#[derive(Debug, Clone)]
pub struct AppOpticsConfig {
    /// API key, sent as the basic-auth username with a blank password.
    pub key: String,
    /// Reported as the `hostname` tag on every shipped measurement.
    pub hostname: String,
}

impl AppOpticsConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("api key"));
        }
        Ok(())
    }
}

/// Credentials and source naming for the form-encoded backend.
#[derive(Debug, Clone)]
pub struct LibratoConfig {
    /// Account email, sent as the basic-auth username.
    pub email: String,
    /// API key, sent as the basic-auth password.
    pub key: String,
    /// Reported as the `source` field when non-empty.
    pub hostname: String,
}

impl LibratoConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.email.trim().is_empty() {
            return Err(ConfigError::MissingCredential("account email"));
        }
        if self.key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("api key"));
        }
        Ok(())
    }
}

/// Pipeline sizing knobs.
#[derive(Debug, Clone)]
pub struct PushPipelineOptions {
    /// Bounded capacity of the snapshot channel, in batches.
    pub queue_capacity: usize,
    /// Ceiling on concurrent in-flight publish requests.
    pub max_lanes: usize,
}

impl Default for PushPipelineOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_lanes: 4,
        }
    }
}

impl PushPipelineOptions {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(self.queue_capacity));
        }
        if self.max_lanes == 0 {
            return Err(ConfigError::InvalidLaneCount(self.max_lanes));
        }
        Ok(())
    }
}

/// The shared delivery client: fixed request timeout, response compression
/// disabled to keep body handling simple.
pub(crate) fn http_client() -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .no_gzip()
        .build()
        .map_err(ConfigError::Client)
}
