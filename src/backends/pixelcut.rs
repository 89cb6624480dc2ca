//! Pixelcut matting adapter
//!
//! Pixelcut takes an `X-API-KEY` header and a binary multipart upload, and
//! reports well-known error identifiers in a JSON body; those refine the
//! status-code classification (credits exhausted is Quota even on a 403,
//! size/resolution rejections are Unsupported even on a 400).

use crate::{
    backends::{build_http_client, classify_status, classify_transport, RemoteMatteClient},
    error::{ProviderErrorKind, ProviderFailure},
    types::CloudProvider,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.developer.pixelcut.ai/v1/remove-background";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct PixelcutError {
    error: Option<String>,
    #[allow(dead_code)]
    message: Option<String>,
}

/// Client for the Pixelcut background removal API
pub struct PixelcutClient {
    client: reqwest::Client,
    endpoint: String,
}

impl PixelcutClient {
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
            client: build_http_client(CloudProvider::Pixelcut, DEFAULT_TIMEOUT)?,
            endpoint: endpoint.into(),
        })
    }

    fn failure(kind: ProviderErrorKind, message: impl Into<String>) -> ProviderFailure {
        ProviderFailure::new(CloudProvider::Pixelcut.name(), kind, message)
    }

    /// Refine classification using Pixelcut's error identifiers
    fn classify_body(status: reqwest::StatusCode, body: &str) -> ProviderErrorKind {
        if let Ok(parsed) = serde_json::from_str::<PixelcutError>(body) {
            match parsed.error.as_deref() {
                Some("insufficient_credits" | "quota_exceeded") => {
                    return ProviderErrorKind::Quota;
                },
                Some("image_too_large" | "resolution_not_supported" | "invalid_image") => {
                    return ProviderErrorKind::Unsupported;
                },
                Some("invalid_api_key") => return ProviderErrorKind::Auth,
                _ => {},
            }
        }
        classify_status(status)
    }
}

#[async_trait]
impl RemoteMatteClient for PixelcutClient {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Pixelcut
    }

    async fn remove_background(
        &self,
        png: &[u8],
        api_key: Option<&str>,
    ) -> Result<Vec<u8>, ProviderFailure> {
        let key = api_key.ok_or_else(|| {
            Self::failure(ProviderErrorKind::Auth, "no API key configured")
        })?;

        debug!(endpoint = %self.endpoint, bytes = png.len(), "pixelcut matting request");

        let part = reqwest::multipart::Part::bytes(png.to_vec())
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| Self::failure(ProviderErrorKind::Unknown, e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("format", "png");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Self::failure(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::failure(
                Self::classify_body(status, &body),
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
