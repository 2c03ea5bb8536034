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

//! Form-encoded backend request shaping.
//!
//! Counters and gauges are indexed independently in the body
//! (`counters[0][name]=...&gauges[0][name]=...`), prefixed with the source
//! host when configured. Basic auth carries email/key; the User-Agent is
//! intentionally blank.

use crate::config::{http_client, ConfigError, LibratoConfig};
use crate::publisher::{PublishError, PushBackend};
use async_trait::async_trait;
use beacon_core::metric::{Measurement, MetricType};
use reqwest::header;
use std::fmt::Write;

pub const LIBRATO_URL: &str = "https://metrics-api.librato.com/v1/metrics";

pub struct LibratoBackend {
    config: LibratoConfig,
    client: reqwest::Client,
}

impl LibratoBackend {
    pub fn new(config: LibratoConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    fn serialize(&self, batch: &[Measurement]) -> String {
        let mut body = String::new();
        if !self.config.hostname.is_empty() {
            let _ = write!(body, "source={}&", self.config.hostname);
        }

        let (mut counter_index, mut gauge_index) = (0usize, 0usize);
        for measurement in batch {
            let time = measurement.unix_time();
            match measurement.metric_type {
                MetricType::Counter => {
                    let _ = write!(
                        body,
                        "counters[{i}][name]={name}&counters[{i}][value]={value}&counters[{i}][measure_time]={time}&",
                        i = counter_index,
                        name = measurement.name,
                        value = measurement.value,
                    );
                    counter_index += 1;
                }
                // everything that is not a counter ships as a gauge
                _ => {
                    let _ = write!(
                        body,
                        "gauges[{i}][name]={name}&gauges[{i}][value]={value}&gauges[{i}][measure_time]={time}&",
                        i = gauge_index,
                        name = measurement.name,
                        value = measurement.value,
                    );
                    gauge_index += 1;
                }
            }
        }
        body
    }
}

#[async_trait]
impl PushBackend for LibratoBackend {
    async fn deliver(&self, batch: Vec<Measurement>) -> Result<(), PublishError> {
        let response = self
            .client
            .post(LIBRATO_URL)
            .basic_auth(&self.config.email, Some(&self.config.key))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::USER_AGENT, "")
            .body(self.serialize(&batch))
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn backend(hostname: &str) -> LibratoBackend {
        LibratoBackend::new(LibratoConfig {
            email: "ops@example.com".to_string(),
            key: "secret".to_string(),
            hostname: hostname.to_string(),
        })
        .expect("valid configuration")
    }

    fn measurement(name: &str, value: i64, metric_type: MetricType) -> Measurement {
        Measurement {
            id: 0,
            name: name.to_string(),
            captured: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            value,
            metric_type,
            tags: Vec::new(),
        }
    }

    #[test]
    fn missing_credentials_fail_construction() {
        let result = LibratoBackend::new(LibratoConfig {
            email: "ops@example.com".to_string(),
            key: String::new(),
            hostname: String::new(),
        });
        assert!(matches!(result, Err(ConfigError::MissingCredential(_))));
    }

    #[test]
    fn counters_and_gauges_are_indexed_independently() {
        let batch = vec![
            measurement("hits", 5, MetricType::Counter),
            measurement("depth", 9, MetricType::Gauge),
            measurement("misses", 2, MetricType::Counter),
        ];

        let body = backend("").serialize(&batch);
        assert_eq!(
            body,
            "counters[0][name]=hits&counters[0][value]=5&counters[0][measure_time]=1700000000&\
             gauges[0][name]=depth&gauges[0][value]=9&gauges[0][measure_time]=1700000000&\
             counters[1][name]=misses&counters[1][value]=2&counters[1][measure_time]=1700000000&"
        );
    }

    #[test]
    fn the_source_host_prefixes_the_body_when_configured() {
        let batch = vec![measurement("hits", 1, MetricType::Counter)];

        let with_host = backend("worker-1").serialize(&batch);
        assert!(with_host.starts_with("source=worker-1&counters[0][name]=hits&"));

        let without_host = backend("").serialize(&batch);
        assert!(without_host.starts_with("counters[0][name]=hits&"));
    }
}
