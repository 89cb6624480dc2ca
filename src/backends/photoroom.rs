//! PhotoRoom matting adapter
//!
//! PhotoRoom authenticates via an `x-api-key` header; for images at or above
//! 2K the HD removal mode is requested with an extra header.

use crate::{
    backends::{build_http_client, classify_status, classify_transport, RemoteMatteClient},
    error::{ProviderErrorKind, ProviderFailure},
    types::CloudProvider,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://sdk.photoroom.com/v1/segment";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Max dimension at which HD mode kicks in
const HD_THRESHOLD_PX: u32 = 2048;

/// Client for the PhotoRoom segmentation API
pub struct PhotoRoomClient {
    client: reqwest::Client,
    endpoint: String,
}

impl PhotoRoomClient {
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
            client: build_http_client(CloudProvider::PhotoRoom, DEFAULT_TIMEOUT)?,
            endpoint: endpoint.into(),
        })
    }

    fn failure(kind: ProviderErrorKind, message: impl Into<String>) -> ProviderFailure {
        ProviderFailure::new(CloudProvider::PhotoRoom.name(), kind, message)
    }

    /// Cheap PNG header sniff for the max dimension, used to decide HD mode.
    /// Falls back to standard mode when the header cannot be read.
    fn max_dimension(png: &[u8]) -> Option<u32> {
        // IHDR: 8-byte signature, 4-byte length, 4-byte "IHDR", then w/h
        if png.len() < 24 || &png[12..16] != b"IHDR" {
            return None;
        }
        let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
        let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        Some(width.max(height))
    }
}

#[async_trait]
impl RemoteMatteClient for PhotoRoomClient {
    fn provider(&self) -> CloudProvider {
        CloudProvider::PhotoRoom
    }

    async fn remove_background(
        &self,
        png: &[u8],
        api_key: Option<&str>,
    ) -> Result<Vec<u8>, ProviderFailure> {
        let key = api_key.ok_or_else(|| {
            Self::failure(ProviderErrorKind::Auth, "no API key configured")
        })?;

        let hd = Self::max_dimension(png).is_some_and(|d| d >= HD_THRESHOLD_PX);
        debug!(endpoint = %self.endpoint, bytes = png.len(), hd, "photoroom matting request");

        let part = reqwest::multipart::Part::bytes(png.to_vec())
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| Self::failure(ProviderErrorKind::Unknown, e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image_file", part);

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", key)
            .multipart(form);
        if hd {
            request = request.header("pr-hd-background-removal", "true");
        }

        let response = request
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{encode_png, PixelBuffer};

    #[test]
    fn test_png_dimension_sniff() {
        let png = encode_png(&PixelBuffer::blank(320, 200)).unwrap();
        assert_eq!(PhotoRoomClient::max_dimension(&png), Some(320));

        let tall = encode_png(&PixelBuffer::blank(64, 2100)).unwrap();
        assert_eq!(PhotoRoomClient::max_dimension(&tall), Some(2100));

        assert_eq!(PhotoRoomClient::max_dimension(b"not a png"), None);
    }
}
