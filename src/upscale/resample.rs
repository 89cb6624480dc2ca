//! Local Lanczos resampling with post-sharpen
//!
//! The always-available upscale path. Lanczos-3 keeps edges crisp at large
//! factors; the unsharp pass counteracts the residual resample softness.

use crate::{
    error::UpscaleError,
    types::PixelBuffer,
};
use image::imageops::{self, FilterType};
use tracing::debug;

/// Sharpen strength applied after resampling
const SHARPEN_SIGMA: f32 = 1.0;
/// Unsharp threshold; low enough to touch most edges
const SHARPEN_THRESHOLD: i32 = 2;

/// Resample so the max dimension reaches `target_px`, then sharpen
///
/// Produces a new buffer; the input is untouched. Both dimensions scale by
/// the same factor, so aspect ratio is preserved exactly up to rounding.
///
/// # Errors
/// - `UpscaleError::Resample` on a corrupt buffer; must not fail otherwise
pub fn resample_to(image: &PixelBuffer, target_px: u32) -> Result<PixelBuffer, UpscaleError> {
    image
        .validate()
        .map_err(|e| UpscaleError::resample(e.to_string()))?;

    let current_max = image.max_dimension();
    let scale = target_px as f32 / current_max as f32;
    let new_width = (image.width as f32 * scale).round() as u32;
    let new_height = (image.height as f32 * scale).round() as u32;

    debug!(
        from = %format!("{}x{}", image.width, image.height),
        to = %format!("{new_width}x{new_height}"),
        scale,
        "local lanczos resample"
    );

    let rgba = image
        .clone()
        .into_rgba_image()
        .map_err(|e| UpscaleError::resample(e.to_string()))?;
    let resized = imageops::resize(&rgba, new_width, new_height, FilterType::Lanczos3);
    let sharpened = imageops::unsharpen(&resized, SHARPEN_SIGMA, SHARPEN_THRESHOLD);

    Ok(PixelBuffer::from_rgba_image(sharpened))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_hits_target_dimension() {
        let image = PixelBuffer::blank(600, 600);
        let result = resample_to(&image, 2048).unwrap();
        assert_eq!(result.width, 2048);
        assert_eq!(result.height, 2048);
    }

    #[test]
    fn test_aspect_ratio_preserved() {
        let image = PixelBuffer::blank(400, 200);
        let result = resample_to(&image, 1024).unwrap();
        assert_eq!(result.width, 1024);
        assert_eq!(result.height, 512);
    }

    #[test]
    fn test_corrupt_buffer_is_fatal() {
        let corrupt = PixelBuffer {
            width: 10,
            height: 10,
            pixels: vec![0; 3],
        };
        assert!(matches!(
            resample_to(&corrupt, 1024),
            Err(UpscaleError::Resample(_))
        ));
    }
}
