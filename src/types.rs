//! Core value types shared across the finishing pipeline
//!
//! Everything here is a request-scoped value object: the pipeline owns no
//! persistent state, and buffers are either mutated in place or replaced
//! wholesale, never both implicitly.

use crate::error::{MattingError, Result};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Raw RGBA8 pixel buffer, row-major
///
/// Invariant: `pixels.len() == width * height * 4`. [`PixelBuffer::new`]
/// enforces it; every algorithm entry point re-validates via
/// [`PixelBuffer::validate`] so a hand-built corrupt buffer fails loudly
/// instead of panicking mid-scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA8 bytes, row-major, 4 bytes per pixel
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer, validating the size invariant
    ///
    /// # Errors
    /// - `MattingError::InvalidBuffer` when `pixels.len() != width * height * 4`
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let buffer = Self {
            width,
            height,
            pixels,
        };
        buffer.validate()?;
        Ok(buffer)
    }

    /// Create a fully transparent buffer of the given dimensions
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Check the `len == w*h*4` invariant
    ///
    /// # Errors
    /// - `MattingError::InvalidBuffer` on mismatch or zero-sized dimensions
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MattingError::invalid_buffer(format!(
                "zero-sized image: {}x{}",
                self.width, self.height
            )));
        }
        let expected = self.width as usize * self.height as usize * 4;
        if self.pixels.len() != expected {
            return Err(MattingError::invalid_buffer(format!(
                "pixel data length {} does not match {}x{} RGBA ({} bytes expected)",
                self.pixels.len(),
                self.width,
                self.height,
                expected
            )));
        }
        Ok(())
    }

    /// Byte offset of the pixel at `(x, y)`
    #[inline]
    #[must_use]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// RGBA channels of the pixel at `(x, y)`
    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Overwrite the alpha channel of the pixel at `(x, y)`
    #[inline]
    pub fn set_alpha(&mut self, x: u32, y: u32, alpha: u8) {
        let i = self.offset(x, y);
        self.pixels[i + 3] = alpha;
    }

    /// Overwrite the RGB channels of the pixel at `(x, y)`, alpha untouched
    #[inline]
    pub fn set_rgb(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) {
        let i = self.offset(x, y);
        self.pixels[i] = r;
        self.pixels[i + 1] = g;
        self.pixels[i + 2] = b;
    }

    /// Larger of width and height
    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Convert into an [`image::RgbaImage`] without copying pixel data
    ///
    /// # Errors
    /// - `MattingError::InvalidBuffer` when the size invariant is violated
    pub fn into_rgba_image(self) -> Result<RgbaImage> {
        self.validate()?;
        RgbaImage::from_raw(self.width, self.height, self.pixels)
            .ok_or_else(|| MattingError::invalid_buffer("buffer rejected by image container"))
    }

    /// Build from an [`image::RgbaImage`]
    #[must_use]
    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }
}

/// Decode PNG (or any format the `image` crate recognizes) into a [`PixelBuffer`]
///
/// # Errors
/// - `MattingError::Decode` on malformed input; propagated, never retried
pub fn decode_png(bytes: &[u8]) -> Result<PixelBuffer> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| MattingError::decode(format!("failed to decode image bytes: {e}")))?;
    Ok(PixelBuffer::from_rgba_image(decoded.to_rgba8()))
}

/// Encode a [`PixelBuffer`] as PNG bytes
///
/// # Errors
/// - `MattingError::InvalidBuffer` on a corrupt buffer
/// - `MattingError::Encode` when the encoder fails
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>> {
    buffer.validate()?;
    let image = buffer.clone().into_rgba_image()?;
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| MattingError::encode(format!("failed to encode PNG: {e}")))?;
    Ok(bytes)
}

/// Solid RGB color (chroma key color, decontamination fill)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Create a new color
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Default chroma key color used by solid-background generations
    #[must_use]
    pub const fn magenta() -> Self {
        Self::new(255, 0, 255)
    }
}

/// Remote matting provider identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudProvider {
    /// Generic cloud endpoint, API key header
    GenericCloud,
    /// Pixian.ai, HTTP Basic with the API key as username
    Pixian,
    /// BRIA RMBG hosted on Replicate, async job submission plus polling
    ReplicateBria,
    /// Pixelcut, `X-API-KEY` header, multipart upload
    Pixelcut,
    /// PhotoRoom, `x-api-key` header, HD mode for large images
    PhotoRoom,
}

impl CloudProvider {
    /// Stable lowercase name used in logs and error reports
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GenericCloud => "generic-cloud",
            Self::Pixian => "pixian",
            Self::ReplicateBria => "replicate-bria",
            Self::Pixelcut => "pixelcut",
            Self::PhotoRoom => "photoroom",
        }
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Background removal method, validated once at the system boundary
///
/// The core never accepts a free-form string here; callers translate UI
/// selections into this closed set before constructing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MattingMethod {
    /// Deterministically resolves to `FloodFill`
    Auto,
    /// Border-connected flood-fill matting (local, default)
    FloodFill,
    /// Global brightness-threshold matting (local)
    Threshold,
    /// Hue-distance matting against a key color (local)
    ChromaKey,
    /// Remote provider matting with fallback chain
    Cloud(CloudProvider),
    /// Deprecated on-device AI matting; always redirected to `FloodFill`
    AiLocal,
}

impl std::fmt::Display for MattingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::FloodFill => f.write_str("flood-fill"),
            Self::Threshold => f.write_str("threshold"),
            Self::ChromaKey => f.write_str("chroma-key"),
            Self::Cloud(provider) => write!(f, "cloud:{provider}"),
            Self::AiLocal => f.write_str("ai-local"),
        }
    }
}

/// Outcome of a matting request
#[derive(Debug, Clone)]
pub struct MattingResult {
    /// Matted image; background pixels carry alpha 0
    pub image: PixelBuffer,
    /// Method that actually produced the image
    pub method_used: MattingMethod,
    /// Every method attempted, in order, including the successful one
    pub attempted_chain: Vec<MattingMethod>,
}

/// Target output size expressed as a maximum pixel dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionTier {
    /// 1024 px max dimension
    OneK,
    /// 2048 px max dimension
    TwoK,
    /// 4096 px max dimension
    FourK,
}

impl ResolutionTier {
    /// Target maximum dimension in pixels
    #[must_use]
    pub const fn target_px(&self) -> u32 {
        match self {
            Self::OneK => 1024,
            Self::TwoK => 2048,
            Self::FourK => 4096,
        }
    }
}

impl std::fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneK => f.write_str("1K"),
            Self::TwoK => f.write_str("2K"),
            Self::FourK => f.write_str("4K"),
        }
    }
}

/// How an upscale request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscaleMethod {
    /// Image already at or near target; returned unchanged
    None,
    /// Remote AI upscaler at an integer scale factor
    Ai,
    /// Local Lanczos-3 resample plus sharpen
    LocalResample,
}

/// Outcome of an upscale request
///
/// Invariant: `max(new_dimensions) >= max(original_dimensions)`; the engine
/// never downscales.
#[derive(Debug, Clone)]
pub struct UpscaleResult {
    /// Final image
    pub image: PixelBuffer,
    /// Method that produced the final image
    pub method_used: UpscaleMethod,
    /// Dimensions of the input image (width, height)
    pub original_dimensions: (u32, u32),
    /// Dimensions of the output image (width, height)
    pub new_dimensions: (u32, u32),
}
