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

//! JSON-batch backend request shaping.
//!
//! Each batch POSTs `{"measurements": [...]}` with basic auth carrying the
//! API key as username and a blank password, and an intentionally blank
//! User-Agent.

use crate::config::{http_client, AppOpticsConfig, ConfigError};
use crate::publisher::{PublishError, PushBackend};
use async_trait::async_trait;
use beacon_core::metric::Measurement;
use reqwest::header;
use serde::Serialize;
use std::collections::BTreeMap;

pub const APPOPTICS_URL: &str = "https://api.appoptics.com/v1/measurements";

#[derive(Serialize)]
struct WireMeasurement {
    name: String,
    value: i64,
    time: i64,
    tags: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct WireBatch {
    measurements: Vec<WireMeasurement>,
}

pub struct AppOpticsBackend {
    config: AppOpticsConfig,
    client: reqwest::Client,
}

impl AppOpticsBackend {
    pub fn new(config: AppOpticsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    fn serialize(&self, batch: &[Measurement]) -> Result<String, PublishError> {
        let measurements = batch
            .iter()
            .map(|measurement| WireMeasurement {
                name: measurement.name.clone(),
                value: measurement.value,
                time: measurement.unix_time(),
                tags: self.build_tags(measurement),
            })
            .collect();
        serde_json::to_string(&WireBatch { measurements }).map_err(PublishError::Body)
    }

    fn build_tags(&self, measurement: &Measurement) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        for (key, value) in &measurement.tags {
            // the backend rejects empty tag keys and values
            if !key.is_empty() && !value.is_empty() {
                tags.insert(key.clone(), value.clone());
            }
        }
        tags.insert("hostname".to_string(), self.config.hostname.clone());
        tags.insert(
            "metrictype".to_string(),
            measurement.metric_type.as_word().to_string(),
        );
        tags
    }
}

#[async_trait]
impl PushBackend for AppOpticsBackend {
    async fn deliver(&self, batch: Vec<Measurement>) -> Result<(), PublishError> {
        let body = self.serialize(&batch)?;
        let response = self
            .client
            .post(APPOPTICS_URL)
            .basic_auth(&self.config.key, Some(""))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::USER_AGENT, "")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
