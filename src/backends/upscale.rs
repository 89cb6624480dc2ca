//! Remote AI upscale provider adapter

use crate::{
    backends::{build_http_client, classify_status, classify_transport},
    error::{ProviderErrorKind, ProviderFailure},
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Trait for remote AI upscalers
///
/// Providers accept an image and an integer scale factor (2 or 4) and return
/// the upscaled PNG bytes or a single classified failure.
#[async_trait]
pub trait RemoteUpscaleClient: Send + Sync {
    /// Human-readable provider name for logs and error reports
    fn name(&self) -> &str;

    /// Upscale the given PNG by `factor` (2 or 4)
    ///
    /// # Errors
    /// - `ProviderFailure` classified as `Auth`, `Quota`, `Network`,
    ///   `Unsupported`, or `Unknown`
    async fn upscale(
        &self,
        png: &[u8],
        factor: u32,
        api_key: Option<&str>,
    ) -> Result<Vec<u8>, ProviderFailure>;
}

/// HTTP adapter for API-key-header upscale endpoints
pub struct HttpUpscaleClient {
    client: reqwest::Client,
    endpoint: String,
    name: String,
}

impl HttpUpscaleClient {
    /// Create a client for the given endpoint URL
    ///
    /// # Errors
    /// - `ProviderFailure` when the HTTP client cannot be built
    pub fn new<S: Into<String>, N: Into<String>>(
        endpoint: S,
        name: N,
    ) -> Result<Self, ProviderFailure> {
        let name = name.into();
        Ok(Self {
            client: build_http_client(
                // Reuse the generic classification; the name travels in errors
                crate::types::CloudProvider::GenericCloud,
                DEFAULT_TIMEOUT,
            )
            .map_err(|mut e| {
                e.provider = name.clone();
                e
            })?,
            endpoint: endpoint.into(),
            name,
        })
    }

    fn failure(&self, kind: ProviderErrorKind, message: impl Into<String>) -> ProviderFailure {
        ProviderFailure::new(self.name.clone(), kind, message)
    }
}

#[async_trait]
impl RemoteUpscaleClient for HttpUpscaleClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upscale(
        &self,
        png: &[u8],
        factor: u32,
        api_key: Option<&str>,
    ) -> Result<Vec<u8>, ProviderFailure> {
        if factor != 2 && factor != 4 {
            return Err(self.failure(
                ProviderErrorKind::Unsupported,
                format!("unsupported scale factor {factor}, expected 2 or 4"),
            ));
        }
        let key = api_key
            .ok_or_else(|| self.failure(ProviderErrorKind::Auth, "no API key configured"))?;

        debug!(endpoint = %self.endpoint, factor, bytes = png.len(), "AI upscale request");

        let part = reqwest::multipart::Part::bytes(png.to_vec())
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| self.failure(ProviderErrorKind::Unknown, e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("scale", factor.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.failure(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.failure(
                classify_status(status),
                format!("HTTP {status}: {body}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.failure(classify_transport(&e), e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
