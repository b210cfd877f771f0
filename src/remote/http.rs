//! HTTP fetcher for the org chart endpoint
//!
//! Issues `GET {base_url}/{chart_path}/{org_id}/{max_depth}?api-key=...` and returns the
//! body as-is. The API key is never logged.

use crate::config::RemoteConfig;
use crate::error::{redacted_url, ApiError, TransportError};
use crate::remote::{FetchRequest, RemoteTreeFetcher};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct HttpTreeFetcher {
    client: Client,
    base_url: String,
    chart_path: String,
    api_key: String,
}

impl HttpTreeFetcher {
    pub fn new(
        base_url: impl Into<String>,
        chart_path: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            chart_path: chart_path.into(),
            api_key: api_key.into(),
        })
    }

    /// Build a fetcher from validated remote settings
    pub fn from_config(config: &RemoteConfig) -> Result<Self, ApiError> {
        config.validate().map_err(ApiError::ConfigError)?;
        let base_url = config
            .normalized_base_url()
            .ok_or_else(|| ApiError::ConfigError("remote.base_url is not set".to_string()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ApiError::ConfigError("remote.api_key is not set".to_string()))?;
        Self::new(
            base_url,
            config.chart_path.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn chart_url(&self, request: &FetchRequest) -> Result<Url, TransportError> {
        let raw = format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.chart_path.trim_matches('/'),
            request.org_id(),
            request.max_depth()
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {}", raw, e)))?;
        url.query_pairs_mut().append_pair("api-key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl RemoteTreeFetcher for HttpTreeFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, TransportError> {
        let url = self.chart_url(request)?;
        let shown = redacted_url(&url);
        debug!(url = %shown, "Fetching org chart");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url = %shown, status = status.as_u16(), "Org chart request failed");
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: shown,
            });
        }

        let body = response.text().await?;
        info!(url = %shown, bytes = body.len(), "Fetched org chart");
        Ok(body)
    }
}
