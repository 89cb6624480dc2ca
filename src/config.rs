//! Request types and defaults for the finishing pipeline
//!
//! Requests arrive fully formed: API keys and tolerances are resolved by the
//! caller (environment, per-user settings) before a request is built. The
//! core never reads the environment itself.

use crate::{
    error::{MattingError, Result},
    types::{MattingMethod, PixelBuffer, ResolutionTier, Rgb},
};

/// Named defaults consumed by the request builders
pub mod defaults {
    use instant::Duration;

    /// Flood-fill white-ish tolerance (`r,g,b >= 255 - tolerance`)
    pub const FLOOD_FILL_TOLERANCE: u8 = 15;
    /// Global threshold tolerance
    pub const THRESHOLD_TOLERANCE: u8 = 40;
    /// Chroma key hue tolerance in degrees
    pub const CHROMA_TOLERANCE: u8 = 20;
    /// Per-attempt timeout for remote provider calls
    pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(20);
}

/// A fully resolved background removal request
#[derive(Debug, Clone)]
pub struct MattingRequest {
    /// Image to matte; consumed and returned inside the result
    pub image: PixelBuffer,
    /// Selected method (`Auto` resolves to `FloodFill`)
    pub method: MattingMethod,
    /// Method-specific tolerance, 0-255 (degrees for chroma key)
    pub tolerance: u8,
    /// Soften bright edges bordering transparency
    pub edge_smoothing: bool,
    /// Replace whitish fringe colors on translucent edge pixels
    pub decontaminate: bool,
    /// Key color for chroma key matting
    pub chroma_color: Rgb,
    /// API key forwarded to remote providers
    pub cloud_api_key: Option<String>,
}

impl MattingRequest {
    /// Start building a request for the given image
    #[must_use]
    pub fn builder(image: PixelBuffer) -> MattingRequestBuilder {
        MattingRequestBuilder::new(image)
    }
}

/// Builder for [`MattingRequest`]
///
/// Tolerance defaults depend on the selected method, so it is resolved at
/// `build()` time unless set explicitly.
pub struct MattingRequestBuilder {
    image: PixelBuffer,
    method: MattingMethod,
    tolerance: Option<u8>,
    edge_smoothing: bool,
    decontaminate: bool,
    chroma_color: Rgb,
    cloud_api_key: Option<String>,
}

impl MattingRequestBuilder {
    #[must_use]
    pub fn new(image: PixelBuffer) -> Self {
        Self {
            image,
            method: MattingMethod::Auto,
            tolerance: None,
            edge_smoothing: true,
            decontaminate: false,
            chroma_color: Rgb::magenta(),
            cloud_api_key: None,
        }
    }

    #[must_use]
    pub fn method(mut self, method: MattingMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    #[must_use]
    pub fn edge_smoothing(mut self, enabled: bool) -> Self {
        self.edge_smoothing = enabled;
        self
    }

    #[must_use]
    pub fn decontaminate(mut self, enabled: bool) -> Self {
        self.decontaminate = enabled;
        self
    }

    #[must_use]
    pub fn chroma_color(mut self, color: Rgb) -> Self {
        self.chroma_color = color;
        self
    }

    #[must_use]
    pub fn cloud_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.cloud_api_key = Some(key.into());
        self
    }

    /// Build the request, validating the image buffer
    ///
    /// # Errors
    ///
    /// Returns `MattingError` for:
    /// - Corrupt pixel buffers (`len != w*h*4`, zero dimensions)
    /// - A zero chroma tolerance (would reject every pixel)
    pub fn build(self) -> Result<MattingRequest> {
        self.image.validate()?;

        let tolerance = self.tolerance.unwrap_or(match self.method {
            MattingMethod::Threshold => defaults::THRESHOLD_TOLERANCE,
            MattingMethod::ChromaKey => defaults::CHROMA_TOLERANCE,
            _ => defaults::FLOOD_FILL_TOLERANCE,
        });

        if matches!(self.method, MattingMethod::ChromaKey) && tolerance == 0 {
            return Err(MattingError::invalid_request(
                "chroma key tolerance must be at least 1 degree",
            ));
        }

        Ok(MattingRequest {
            image: self.image,
            method: self.method,
            tolerance,
            edge_smoothing: self.edge_smoothing,
            decontaminate: self.decontaminate,
            chroma_color: self.chroma_color,
            cloud_api_key: self.cloud_api_key,
        })
    }
}

/// A fully resolved upscale request
#[derive(Debug, Clone)]
pub struct UpscaleRequest {
    /// Image to upscale
    pub image: PixelBuffer,
    /// Requested output tier
    pub target_tier: ResolutionTier,
    /// Try the AI provider before local resampling
    pub prefer_ai: bool,
    /// API key forwarded to the AI upscale provider
    pub api_key: Option<String>,
}

impl UpscaleRequest {
    /// Create a request with AI upscaling preferred
    #[must_use]
    pub fn new(image: PixelBuffer, target_tier: ResolutionTier) -> Self {
        Self {
            image,
            target_tier,
            prefer_ai: true,
            api_key: None,
        }
    }

    #[must_use]
    pub fn prefer_ai(mut self, prefer: bool) -> Self {
        self.prefer_ai = prefer;
        self
    }

    #[must_use]
    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.api_key = Some(key.into());
        self
    }
}
