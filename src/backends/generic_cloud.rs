//! Generic cloud matting adapter
//!
//! The simplest provider shape: raw PNG POST with an API key header, PNG
//! bytes back. Used for self-hosted or white-label removal endpoints.

use crate::{
    backends::{build_http_client, classify_status, classify_transport, RemoteMatteClient},
    error::{ProviderErrorKind, ProviderFailure},
    types::CloudProvider,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a generic API-key-header removal endpoint
pub struct GenericCloudClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GenericCloudClient {
    /// Create a client for the given endpoint URL
    ///
    /// # Errors
    /// - `ProviderFailure` when the HTTP client cannot be built
    pub fn new<S: Into<String>>(endpoint: S) -> Result<Self, ProviderFailure> {
        Ok(Self {
            client: build_http_client(CloudProvider::GenericCloud, DEFAULT_TIMEOUT)?,
            endpoint: endpoint.into(),
        })
    }

    fn failure(kind: ProviderErrorKind, message: impl Into<String>) -> ProviderFailure {
        ProviderFailure::new(CloudProvider::GenericCloud.name(), kind, message)
    }
}

#[async_trait]
impl RemoteMatteClient for GenericCloudClient {
    fn provider(&self) -> CloudProvider {
        CloudProvider::GenericCloud
    }

    async fn remove_background(
        &self,
        png: &[u8],
        api_key: Option<&str>,
    ) -> Result<Vec<u8>, ProviderFailure> {
        let key = api_key.ok_or_else(|| {
            Self::failure(ProviderErrorKind::Auth, "no API key configured")
        })?;

        debug!(endpoint = %self.endpoint, bytes = png.len(), "generic cloud matting request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", key)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(png.to_vec())
            .send()
            .await
            .map_err(|e| Self::failure(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::failure(
                classify_status(status),
                format!("HTTP {status}: {body}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::failure(classify_transport(&e), e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
