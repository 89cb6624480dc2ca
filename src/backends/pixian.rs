//! Pixian.ai matting adapter
//!
//! Pixian authenticates with HTTP Basic where the API key is the username
//! (empty password) and takes the image as a multipart upload.

use crate::{
    backends::{build_http_client, classify_status, classify_transport, RemoteMatteClient},
    error::{ProviderErrorKind, ProviderFailure},
    types::CloudProvider,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.pixian.ai/api/v2/remove-background";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Pixian.ai background removal API
pub struct PixianClient {
    client: reqwest::Client,
    endpoint: String,
}

impl PixianClient {
    /// Create a client against the production endpoint
    ///
    /// # Errors
    /// - `ProviderFailure` when the HTTP client cannot be built
    pub fn new() -> Result<Self, ProviderFailure> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Create a client against a custom endpoint (tests, proxies)
    ///
    /// # Errors
    /// - `ProviderFailure` when the HTTP client cannot be built
    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Result<Self, ProviderFailure> {
        Ok(Self {
            client: build_http_client(CloudProvider::Pixian, DEFAULT_TIMEOUT)?,
            endpoint: endpoint.into(),
        })
    }

    fn failure(kind: ProviderErrorKind, message: impl Into<String>) -> ProviderFailure {
        ProviderFailure::new(CloudProvider::Pixian.name(), kind, message)
    }
}

#[async_trait]
impl RemoteMatteClient for PixianClient {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Pixian
    }

    async fn remove_background(
        &self,
        png: &[u8],
        api_key: Option<&str>,
    ) -> Result<Vec<u8>, ProviderFailure> {
        let key = api_key.ok_or_else(|| {
            Self::failure(ProviderErrorKind::Auth, "no API key configured")
        })?;

        debug!(endpoint = %self.endpoint, bytes = png.len(), "pixian matting request");

        let part = reqwest::multipart::Part::bytes(png.to_vec())
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| Self::failure(ProviderErrorKind::Unknown, e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(&self.endpoint)
            // API key as username, empty password
            .basic_auth(key, Option::<&str>::None)
            .multipart(form)
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
