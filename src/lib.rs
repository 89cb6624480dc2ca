#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]

//! # Image Finishing Pipeline
//!
//! Post-generation finishing for AI-generated images: background matting and
//! resolution upscaling with graceful multi-provider degradation.
//!
//! The pipeline takes freshly generated raster bytes and (a) removes the
//! background via local pixel-level algorithms (border-connected flood fill,
//! brightness threshold, chroma key) or remote matting providers, and
//! (b) decides whether and how to bring the image up to a requested
//! resolution tier, preferring an AI upscaler and falling back to local
//! Lanczos resampling. The engine never downscales.
//!
//! ## Features
//!
//! - **Local matting**: flood fill (preserves interior white detail),
//!   threshold with color decontamination, HSV chroma key
//! - **Remote matting**: Pixian, Replicate-hosted BRIA, Pixelcut, PhotoRoom,
//!   and generic API-key endpoints behind one trait
//! - **Fallback chains**: ordered, sequential, fully recorded per attempt
//! - **Typed failures**: every provider error classified once at the adapter
//!   boundary (`Auth`/`Quota`/`Network`/`Unsupported`/`Unknown`)
//! - **Upscale tiers**: 1K/2K/4K max-dimension targets, AI at 2x/4x with
//!   local Lanczos-3 + sharpen fallback
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgfinish::{
//!     matte_from_bytes, MattingDispatcher, MattingMethod, MattingRequest,
//! };
//!
//! # async fn example(generated_png: Vec<u8>) -> anyhow::Result<()> {
//! // Local-only dispatcher; cloud providers are injected when configured
//! let dispatcher = MattingDispatcher::local_only();
//! let matted_png = matte_from_bytes(&generated_png, MattingMethod::Auto, &dispatcher).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Provider injection
//!
//! Remote clients are constructed by the caller and injected through a
//! [`ClientRegistry`]; there are no lazily-initialized global clients:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use imgfinish::{
//!     ClientRegistry, MattingDispatcher, PixelcutClient, ReplicateBriaClient,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut registry = ClientRegistry::new();
//! registry.register(Arc::new(PixelcutClient::new()?));
//! registry.register(Arc::new(ReplicateBriaClient::new()?));
//! let dispatcher = MattingDispatcher::new(registry);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod color;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod matting;
pub mod types;
pub mod upscale;

// Public API exports
pub use backends::{
    ClientRegistry, GenericCloudClient, HttpUpscaleClient, PhotoRoomClient, PixelcutClient,
    PixianClient, RemoteMatteClient, RemoteUpscaleClient, ReplicateBriaClient,
};
pub use config::{defaults, MattingRequest, MattingRequestBuilder, UpscaleRequest};
pub use dispatcher::MattingDispatcher;
pub use error::{
    AttemptFailure, MattingError, ProviderErrorKind, ProviderFailure, Result, UpscaleError,
};
pub use matting::{ChromaKeyOptions, FloodFillOptions, ThresholdOptions};
pub use types::{
    decode_png, encode_png, CloudProvider, MattingMethod, MattingResult, PixelBuffer,
    ResolutionTier, Rgb, UpscaleMethod, UpscaleResult,
};
pub use upscale::UpscaleDecisionEngine;

/// Matte an image provided as PNG bytes, returning matted PNG bytes
///
/// Convenience wrapper for callers that work at the byte level (web
/// handlers, queue consumers). Decodes, dispatches with default options for
/// the given method, and re-encodes.
///
/// # Errors
///
/// Returns `MattingError` for:
/// - Malformed input bytes (`Decode`)
/// - Exhausted fallback chains (`AllMethodsExhausted`)
pub async fn matte_from_bytes(
    png: &[u8],
    method: MattingMethod,
    dispatcher: &MattingDispatcher,
) -> Result<Vec<u8>> {
    let image = decode_png(png)?;
    let request = MattingRequest::builder(image).method(method).build()?;
    let result = dispatcher.matte(request).await?;
    encode_png(&result.image)
}

/// Run the full finishing pipeline: matte, then upscale, at the byte level
///
/// # Errors
///
/// Returns `anyhow::Error` wrapping the typed matting or upscale error; use
/// the structured APIs directly when the attempt trace matters.
pub async fn finish_image(
    png: &[u8],
    method: MattingMethod,
    target_tier: ResolutionTier,
    dispatcher: &MattingDispatcher,
    engine: &UpscaleDecisionEngine,
) -> anyhow::Result<Vec<u8>> {
    let image = decode_png(png)?;
    let request = MattingRequest::builder(image).method(method).build()?;
    let matted = dispatcher.matte(request).await?;

    let upscaled = engine
        .upscale(UpscaleRequest::new(matted.image, target_tier))
        .await?;

    Ok(encode_png(&upscaled.image)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_matte_from_bytes_round_trip() {
        let mut image = PixelBuffer::blank(6, 6);
        for y in 0..6 {
            for x in 0..6 {
                image.set_rgb(x, y, 255, 255, 255);
                image.set_alpha(x, y, 255);
            }
        }
        // Dark square in the middle
        for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3)] {
            image.set_rgb(x, y, 20, 20, 20);
        }
        let png = encode_png(&image).unwrap();

        let dispatcher = MattingDispatcher::local_only();
        let matted_png = matte_from_bytes(&png, MattingMethod::Auto, &dispatcher)
            .await
            .unwrap();

        let matted = decode_png(&matted_png).unwrap();
        assert_eq!(matted.get(0, 0)[3], 0, "white background removed");
        assert_eq!(matted.get(2, 2)[3], 255, "dark subject kept");
    }

    #[tokio::test]
    async fn test_matte_from_bytes_rejects_garbage() {
        let dispatcher = MattingDispatcher::local_only();
        let result = matte_from_bytes(b"nope", MattingMethod::Auto, &dispatcher).await;
        assert!(matches!(result, Err(MattingError::Decode(_))));
    }
}
