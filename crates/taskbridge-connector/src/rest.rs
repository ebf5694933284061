//! Generic REST connector for the shared PM integration contract.
//!
//! Every supported tool is reachable through an integration endpoint that
//! speaks the same two routes:
//!
//! - `GET {endpoint}/pm/import?resource={resource}` → `{ "items": [...] }`
//! - `POST {endpoint}/pm/export` with `{ "resource": ..., "items": [...] }`
//!   → `{ "count": n }`
//!
//! Requests carry the installation's API key as a bearer token.

use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use async_trait::async_trait;
use taskbridge_core::{Installation, Provider};

use std::sync::Arc;

use crate::error::{ConnectorError, ConnectorResult};
use crate::item::ExternalItem;
use crate::traits::{ConnectorFactory, PmConnector};

/// Configuration for the REST connector.
#[derive(Clone)]
pub struct RestConfig {
    /// Provider behind the endpoint.
    pub provider: Provider,
    /// Base URL of the integration endpoint, without trailing slash.
    pub endpoint: String,
    /// Bearer token.
    pub api_key: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    pub read_timeout_secs: u64,
}

impl std::fmt::Debug for RestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConfig")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("api_key", &"***")
            .finish()
    }
}

impl RestConfig {
    /// Build a config from an installation.
    #[must_use]
    pub fn from_installation(installation: &Installation) -> Self {
        Self {
            provider: installation.provider,
            endpoint: installation.api_endpoint.trim_end_matches('/').to_string(),
            api_key: installation.api_key.clone(),
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "endpoint must not be empty",
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "api_key must not be empty",
            ));
        }
        Ok(())
    }

    /// URL of the import route.
    #[must_use]
    pub fn import_url(&self) -> String {
        format!("{}/pm/import", self.endpoint)
    }

    /// URL of the export route.
    #[must_use]
    pub fn export_url(&self) -> String {
        format!("{}/pm/export", self.endpoint)
    }
}

#[derive(Debug, Deserialize)]
struct ImportResponse {
    #[serde(default)]
    items: Vec<ExternalItem>,
}

#[derive(Debug, Serialize)]
struct ExportRequest<'a> {
    resource: &'a str,
    items: Vec<ExternalItem>,
}

#[derive(Debug, Deserialize)]
struct ExportResponse {
    count: usize,
}

/// REST connector for a configured installation.
pub struct RestPmConnector {
    config: RestConfig,
    display_name: String,
    client: Client,
}

impl std::fmt::Debug for RestPmConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestPmConnector")
            .field("config", &self.config)
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl RestPmConnector {
    /// Create a new connector with the given configuration.
    pub fn new(config: RestConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let display_name = format!("{}: {}", config.provider, config.endpoint);
        let client = Client::builder()
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                ConnectorError::invalid_configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            display_name,
            client,
        })
    }

    /// Create a connector for an installation.
    pub fn for_installation(installation: &Installation) -> ConnectorResult<Self> {
        Self::new(RestConfig::from_installation(installation))
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }

    /// Map a non-success response to a connector error.
    async fn error_for(response: Response) -> ConnectorError {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ConnectorError::AuthenticationFailed
            }
            StatusCode::TOO_MANY_REQUESTS => ConnectorError::RateLimited {
                retry_after_secs: parse_retry_after(&response),
            },
            _ => {
                let message = response.text().await.unwrap_or_default();
                ConnectorError::ApiError {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }
}

/// Parse a Retry-After header as delay seconds.
fn parse_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

/// Factory producing a [`RestPmConnector`] per installation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestConnectorFactory;

impl RestConnectorFactory {
    /// Create a factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ConnectorFactory for RestConnectorFactory {
    fn connector_for(&self, installation: &Installation) -> ConnectorResult<Arc<dyn PmConnector>> {
        Ok(Arc::new(RestPmConnector::for_installation(installation)?))
    }
}

#[async_trait]
impl PmConnector for RestPmConnector {
    fn provider(&self) -> Provider {
        self.config.provider
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        // An import fetch with an empty resource acts as the probe; the
        // integration endpoint answers it without side effects.
        let response = self
            .client
            .get(self.config.import_url())
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| ConnectorError::connection_failed(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response).await)
        }
    }

    #[instrument(skip(self), fields(provider = %self.config.provider))]
    async fn fetch_items(&self, resource: &str) -> ConnectorResult<Vec<ExternalItem>> {
        let response = self
            .client
            .get(self.config.import_url())
            .query(&[("resource", resource)])
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| ConnectorError::connection_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: ImportResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::invalid_response(e.to_string()))?;

        debug!(
            resource = %resource,
            count = body.items.len(),
            "Fetched items from external tool"
        );
        Ok(body.items)
    }

    #[instrument(skip(self, items), fields(provider = %self.config.provider))]
    async fn export_items(
        &self,
        resource: &str,
        items: Vec<ExternalItem>,
    ) -> ConnectorResult<usize> {
        let request = ExportRequest { resource, items };
        let response = self
            .client
            .post(self.config.export_url())
            .header(header::AUTHORIZATION, self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| ConnectorError::connection_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: ExportResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::invalid_response(e.to_string()))?;

        debug!(resource = %resource, count = body.count, "Exported items to external tool");
        Ok(body.count)
    }
}
