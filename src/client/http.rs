//! HTTP implementation of the backend client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{Backend, ClientError, MetricsFetcher};
use crate::data::{MetricsSnapshot, OptimizationKind, OptimizeRequest, OptimizeResponse};
use crate::settings::Settings;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    description: String,
}

impl HttpBackend {
    /// Create a client for `base_url` with the default timeout.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client for `base_url` with a custom per-request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let description = format!("backend: {}", base_url);
        Ok(Self {
            client,
            base_url,
            description,
        })
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl MetricsFetcher for HttpBackend {
    async fn fetch_metrics(&self) -> Result<MetricsSnapshot, ClientError> {
        let response = self.client.get(self.url("/metrics")).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await?;
        let snapshot = MetricsSnapshot::decode(&body)?;
        debug!(
            lcp = snapshot.lcp.len(),
            tbt = snapshot.tbt.len(),
            inp = snapshot.inp.len(),
            "fetched metrics"
        );
        Ok(snapshot)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn optimize(&self, kind: OptimizationKind) -> Result<OptimizeResponse, ClientError> {
        let request = OptimizeRequest {
            kind: kind.as_str().to_string(),
        };
        let response = self
            .client
            .post(self.url("/optimize"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let reason = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<OptimizeResponse>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), ClientError> {
        let response = self
            .client
            .put(self.url("/settings"))
            .json(settings)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            status if status.is_client_error() => {
                let reason = response.text().await.unwrap_or_default();
                Err(ClientError::Rejected {
                    status: status.as_u16(),
                    reason,
                })
            }
            status => Err(ClientError::Status {
                status: status.as_u16(),
            }),
        }
    }
}
