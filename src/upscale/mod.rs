//! Upscale decision engine
//!
//! Given current vs. target dimensions the engine decides between no-op, AI
//! upscale, and local resample, and executes the decision. The one hard
//! invariant: the engine never downscales, no matter what a provider returns.

pub mod resample;

use crate::{
    backends::RemoteUpscaleClient,
    config::{defaults, UpscaleRequest},
    error::UpscaleError,
    types::{decode_png, encode_png, PixelBuffer, UpscaleMethod, UpscaleResult},
};
use instant::Duration;
use log::info;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Fraction of the target at which an image counts as native resolution
///
/// A generation within 10% of the tier target is not worth a provider call;
/// the visible difference is negligible and every AI attempt costs quota.
const NATIVE_RESOLUTION_FRACTION: f32 = 0.9;

/// Decides and executes the upscale path for a request
pub struct UpscaleDecisionEngine {
    client: Option<Arc<dyn RemoteUpscaleClient>>,
    attempt_timeout: Duration,
}

impl UpscaleDecisionEngine {
    /// Engine with an AI provider available
    #[must_use]
    pub fn new(client: Arc<dyn RemoteUpscaleClient>) -> Self {
        Self {
            client: Some(client),
            attempt_timeout: defaults::ATTEMPT_TIMEOUT,
        }
    }

    /// Engine that only ever resamples locally
    #[must_use]
    pub fn local_only() -> Self {
        Self {
            client: None,
            attempt_timeout: defaults::ATTEMPT_TIMEOUT,
        }
    }

    /// Override the AI attempt timeout
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Execute an upscale request
    ///
    /// # Errors
    ///
    /// Returns `UpscaleError` for:
    /// - Corrupt input buffers
    /// - Local resample failures (fatal; the AI path falls back instead)
    #[instrument(
        skip(self, request),
        fields(
            tier = %request.target_tier,
            dimensions = %format!("{}x{}", request.image.width, request.image.height)
        )
    )]
    pub async fn upscale(&self, request: UpscaleRequest) -> Result<UpscaleResult, UpscaleError> {
        request
            .image
            .validate()
            .map_err(|e| UpscaleError::invalid_request(e.to_string()))?;

        let target_px = request.target_tier.target_px();
        let current_max = request.image.max_dimension();
        let original_dimensions = (request.image.width, request.image.height);

        // Hard invariant: never downscale
        if current_max >= target_px {
            debug!(current_max, target_px, "image at or above target, no-op");
            return Ok(Self::unchanged(request.image, original_dimensions));
        }

        // Within 10% of target: treat as native resolution, skip the work
        if current_max as f32 >= target_px as f32 * NATIVE_RESOLUTION_FRACTION {
            debug!(current_max, target_px, "image within 10% of target, skipping");
            return Ok(Self::unchanged(request.image, original_dimensions));
        }

        if request.prefer_ai {
            if let Some(client) = &self.client {
                let factor = Self::scale_factor(current_max, target_px);
                info!(
                    "AI upscale attempt: {}x at {} via {}",
                    factor,
                    request.target_tier,
                    client.name()
                );
                match self
                    .attempt_ai(client.as_ref(), &request.image, factor, request.api_key.as_deref())
                    .await
                {
                    Ok(upscaled) if upscaled.max_dimension() >= current_max => {
                        let new_dimensions = (upscaled.width, upscaled.height);
                        return Ok(UpscaleResult {
                            image: upscaled,
                            method_used: UpscaleMethod::Ai,
                            original_dimensions,
                            new_dimensions,
                        });
                    },
                    Ok(_) => {
                        warn!("AI upscaler returned a smaller image; falling back to local resample");
                    },
                    Err(error) => {
                        warn!("AI upscale failed, falling back to local resample: {error}");
                    },
                }
            }
        }

        let resampled = resample::resample_to(&request.image, target_px)?;
        let new_dimensions = (resampled.width, resampled.height);
        Ok(UpscaleResult {
            image: resampled,
            method_used: UpscaleMethod::LocalResample,
            original_dimensions,
            new_dimensions,
        })
    }

    /// Nearest supported integer factor for the needed ratio: 2x or 4x
    fn scale_factor(current_max: u32, target_px: u32) -> u32 {
        if target_px as f32 / current_max as f32 <= 2.0 {
            2
        } else {
            4
        }
    }

    fn unchanged(image: PixelBuffer, original_dimensions: (u32, u32)) -> UpscaleResult {
        UpscaleResult {
            image,
            method_used: UpscaleMethod::None,
            original_dimensions,
            new_dimensions: original_dimensions,
        }
    }

    async fn attempt_ai(
        &self,
        client: &dyn RemoteUpscaleClient,
        image: &PixelBuffer,
        factor: u32,
        api_key: Option<&str>,
    ) -> Result<PixelBuffer, UpscaleError> {
        let png = encode_png(image).map_err(|e| UpscaleError::invalid_request(e.to_string()))?;

        let bytes = tokio::time::timeout(self.attempt_timeout, client.upscale(&png, factor, api_key))
            .await
            .map_err(|_| {
                UpscaleError::Provider(crate::error::ProviderFailure::new(
                    client.name(),
                    crate::error::ProviderErrorKind::Network,
                    format!(
                        "AI upscale timed out after {}ms",
                        self.attempt_timeout.as_millis()
                    ),
                ))
            })?
            .map_err(UpscaleError::Provider)?;

        decode_png(&bytes).map_err(|e| {
            UpscaleError::Provider(crate::error::ProviderFailure::new(
                client.name(),
                crate::error::ProviderErrorKind::Unknown,
                format!("provider returned undecodable image: {e}"),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockUpscaleClient;
    use crate::error::ProviderErrorKind;
    use crate::types::ResolutionTier;

    fn engine_with_failing_ai() -> UpscaleDecisionEngine {
        UpscaleDecisionEngine::new(Arc::new(MockUpscaleClient::failing(
            ProviderErrorKind::Network,
        )))
    }

    #[tokio::test]
    async fn test_no_op_when_at_or_above_target() {
        let engine = UpscaleDecisionEngine::local_only();
        let request = UpscaleRequest::new(PixelBuffer::blank(2048, 1024), ResolutionTier::TwoK);
        let result = engine.upscale(request).await.unwrap();
        assert_eq!(result.method_used, UpscaleMethod::None);
        assert_eq!(result.new_dimensions, (2048, 1024));

        let request = UpscaleRequest::new(PixelBuffer::blank(4000, 4000), ResolutionTier::TwoK);
        let result = engine.upscale(request).await.unwrap();
        assert_eq!(result.method_used, UpscaleMethod::None, "never downscale");
    }

    #[tokio::test]
    async fn test_near_target_skip() {
        // 95% of 2048 is within the native-resolution band
        let engine = UpscaleDecisionEngine::local_only();
        let request = UpscaleRequest::new(PixelBuffer::blank(1946, 1946), ResolutionTier::TwoK);
        let result = engine.upscale(request).await.unwrap();
        assert_eq!(result.method_used, UpscaleMethod::None);
    }

    #[tokio::test]
    async fn test_just_under_native_band_resamples() {
        // 89% of target: below the band, must upscale
        let engine = UpscaleDecisionEngine::local_only();
        let request = UpscaleRequest::new(PixelBuffer::blank(1822, 1822), ResolutionTier::TwoK);
        let result = engine.upscale(request).await.unwrap();
        assert_eq!(result.method_used, UpscaleMethod::LocalResample);
        assert_eq!(result.new_dimensions, (2048, 2048));
    }

    #[tokio::test]
    async fn test_ai_failure_falls_back_to_local_resample() {
        let engine = engine_with_failing_ai();
        let request = UpscaleRequest::new(PixelBuffer::blank(600, 600), ResolutionTier::TwoK);
        let result = engine.upscale(request).await.unwrap();
        assert_eq!(result.method_used, UpscaleMethod::LocalResample);
        assert_eq!(result.new_dimensions, (2048, 2048));
        assert_eq!(result.original_dimensions, (600, 600));
    }

    #[tokio::test]
    async fn test_ai_success_used_when_preferred() {
        let upscaled = encode_png(&PixelBuffer::blank(2048, 2048)).unwrap();
        let engine = UpscaleDecisionEngine::new(Arc::new(MockUpscaleClient::succeeding(upscaled)));
        let request = UpscaleRequest::new(PixelBuffer::blank(600, 600), ResolutionTier::TwoK);
        let result = engine.upscale(request).await.unwrap();
        assert_eq!(result.method_used, UpscaleMethod::Ai);
        assert_eq!(result.new_dimensions, (2048, 2048));
    }

    #[tokio::test]
    async fn test_prefer_ai_false_skips_provider() {
        let client = Arc::new(MockUpscaleClient::succeeding(vec![]));
        let engine = UpscaleDecisionEngine::new(client.clone());
        let request = UpscaleRequest::new(PixelBuffer::blank(600, 600), ResolutionTier::TwoK)
            .prefer_ai(false);
        let result = engine.upscale(request).await.unwrap();
        assert_eq!(result.method_used, UpscaleMethod::LocalResample);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_shrinking_provider_result_rejected() {
        // A buggy provider returning a smaller image must not violate the
        // never-downscale invariant
        let shrunk = encode_png(&PixelBuffer::blank(300, 300)).unwrap();
        let engine = UpscaleDecisionEngine::new(Arc::new(MockUpscaleClient::succeeding(shrunk)));
        let request = UpscaleRequest::new(PixelBuffer::blank(600, 600), ResolutionTier::TwoK);
        let result = engine.upscale(request).await.unwrap();
        assert_eq!(result.method_used, UpscaleMethod::LocalResample);
        assert_eq!(result.new_dimensions, (2048, 2048));
    }

    #[test]
    fn test_scale_factor_selection() {
        // Ratio <= 2 picks 2x, anything beyond picks 4x
        assert_eq!(UpscaleDecisionEngine::scale_factor(1024, 2048), 2);
        assert_eq!(UpscaleDecisionEngine::scale_factor(600, 2048), 4);
        assert_eq!(UpscaleDecisionEngine::scale_factor(1024, 4096), 4);
        assert_eq!(UpscaleDecisionEngine::scale_factor(600, 1024), 2);
    }
}
