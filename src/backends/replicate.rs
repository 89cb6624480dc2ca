//! Replicate-hosted BRIA RMBG matting adapter
//!
//! Unlike the synchronous providers, Replicate runs predictions as async
//! jobs: submit the image as a base64 data URI, poll the prediction URL
//! until it settles, then fetch the output image from the URL it reports.

use crate::{
    backends::{build_http_client, classify_status, classify_transport, RemoteMatteClient},
    error::{ProviderErrorKind, ProviderFailure},
    types::CloudProvider,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const PREDICTIONS_ENDPOINT: &str = "https://api.replicate.com/v1/predictions";
/// BRIA RMBG model version pin
const BRIA_VERSION: &str = "fb8af171cfa1616ddcf1242c093f9c46bcada5ad4cf6f2fbe8b81b330ec5c003";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(750);
const MAX_POLLS: u32 = 40;

#[derive(Debug, Deserialize)]
struct Prediction {
    status: String,
    output: Option<serde_json::Value>,
    error: Option<String>,
    urls: PredictionUrls,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: String,
}

/// Client for the BRIA background removal model hosted on Replicate
pub struct ReplicateBriaClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ReplicateBriaClient {
    /// Create a client against the production endpoint
    ///
    /// # Errors
    /// - `ProviderFailure` when the HTTP client cannot be built
    pub fn new() -> Result<Self, ProviderFailure> {
        Self::with_endpoint(PREDICTIONS_ENDPOINT)
    }

    /// Create a client against a custom endpoint (tests, proxies)
    ///
    /// # Errors
    /// - `ProviderFailure` when the HTTP client cannot be built
    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Result<Self, ProviderFailure> {
        Ok(Self {
            client: build_http_client(CloudProvider::ReplicateBria, DEFAULT_TIMEOUT)?,
            endpoint: endpoint.into(),
        })
    }

    fn failure(kind: ProviderErrorKind, message: impl Into<String>) -> ProviderFailure {
        ProviderFailure::new(CloudProvider::ReplicateBria.name(), kind, message)
    }

    async fn submit(&self, png: &[u8], key: &str) -> Result<Prediction, ProviderFailure> {
        let data_uri = format!("data:image/png;base64,{}", BASE64.encode(png));
        let body = json!({
            "version": BRIA_VERSION,
            "input": { "image": data_uri },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("Token {key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::failure(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::failure(
                classify_status(status),
                format!("prediction submit failed, HTTP {status}: {body}"),
            ));
        }

        response
            .json::<Prediction>()
            .await
            .map_err(|e| Self::failure(ProviderErrorKind::Unknown, e.to_string()))
    }

    async fn poll(&self, url: &str, key: &str) -> Result<Prediction, ProviderFailure> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, format!("Token {key}"))
            .send()
            .await
            .map_err(|e| Self::failure(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::failure(
                classify_status(status),
                format!("prediction poll failed, HTTP {status}"),
            ));
        }

        response
            .json::<Prediction>()
            .await
            .map_err(|e| Self::failure(ProviderErrorKind::Unknown, e.to_string()))
    }

    /// Pull the output image URL out of the prediction's `output` field,
    /// which is either a string or a single-element array of strings.
    fn output_url(prediction: &Prediction) -> Result<String, ProviderFailure> {
        let output = prediction.output.as_ref().ok_or_else(|| {
            Self::failure(ProviderErrorKind::Unknown, "prediction has no output")
        })?;
        match output {
            serde_json::Value::String(url) => Ok(url.clone()),
            serde_json::Value::Array(items) => items
                .first()
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| {
                    Self::failure(ProviderErrorKind::Unknown, "empty prediction output array")
                }),
            other => Err(Self::failure(
                ProviderErrorKind::Unknown,
                format!("unexpected prediction output shape: {other}"),
            )),
        }
    }

    async fn fetch_output(&self, url: &str) -> Result<Vec<u8>, ProviderFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::failure(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::failure(
                classify_status(status),
                format!("output fetch failed, HTTP {status}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::failure(classify_transport(&e), e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl RemoteMatteClient for ReplicateBriaClient {
    fn provider(&self) -> CloudProvider {
        CloudProvider::ReplicateBria
    }

    async fn remove_background(
        &self,
        png: &[u8],
        api_key: Option<&str>,
    ) -> Result<Vec<u8>, ProviderFailure> {
        let key = api_key.ok_or_else(|| {
            Self::failure(ProviderErrorKind::Auth, "no API key configured")
        })?;

        debug!(bytes = png.len(), "replicate-bria prediction submit");
        let mut prediction = self.submit(png, key).await?;

        let mut polls = 0;
        while matches!(prediction.status.as_str(), "starting" | "processing") {
            if polls >= MAX_POLLS {
                return Err(Self::failure(
                    ProviderErrorKind::Network,
                    format!("prediction still pending after {MAX_POLLS} polls"),
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            prediction = self.poll(&prediction.urls.get, key).await?;
            polls += 1;
        }

        match prediction.status.as_str() {
            "succeeded" => {
                let url = Self::output_url(&prediction)?;
                self.fetch_output(&url).await
            },
            "canceled" => Err(Self::failure(
                ProviderErrorKind::Unknown,
                "prediction canceled upstream",
            )),
            _ => Err(Self::failure(
                ProviderErrorKind::Unknown,
                prediction
                    .error
                    .unwrap_or_else(|| format!("prediction {}", prediction.status)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(output: Option<serde_json::Value>) -> Prediction {
        Prediction {
            status: "succeeded".to_string(),
            output,
            error: None,
            urls: PredictionUrls {
                get: "https://example.invalid/get".to_string(),
            },
        }
    }

    #[test]
    fn test_output_url_string_shape() {
        let p = prediction(Some(json!("https://cdn.example/out.png")));
        assert_eq!(
            ReplicateBriaClient::output_url(&p).unwrap(),
            "https://cdn.example/out.png"
        );
    }

    #[test]
    fn test_output_url_array_shape() {
        let p = prediction(Some(json!(["https://cdn.example/first.png", "x"])));
        assert_eq!(
            ReplicateBriaClient::output_url(&p).unwrap(),
            "https://cdn.example/first.png"
        );
    }

    #[test]
    fn test_output_url_missing_or_malformed() {
        assert!(ReplicateBriaClient::output_url(&prediction(None)).is_err());
        assert!(ReplicateBriaClient::output_url(&prediction(Some(json!(42)))).is_err());
        assert!(ReplicateBriaClient::output_url(&prediction(Some(json!([])))).is_err());
    }
}
