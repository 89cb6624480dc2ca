//! Chroma key matting for solid-color-background generations
//!
//! Generations prompted onto a solid key color (magenta by default) are
//! matted by hue distance in HSV space. Saturation and value guards keep
//! near-black and near-gray pixels from false-matching every hue.

use crate::{
    color::{hue_distance, rgb_to_hsv},
    error::Result,
    types::{PixelBuffer, Rgb},
};
use tracing::debug;

/// Saturation below which a pixel can never match the key
const SATURATION_GUARD: f32 = 0.3;
/// Value below which a pixel can never match the key
const VALUE_GUARD: f32 = 0.3;

/// Tunables for the chroma key matter
#[derive(Debug, Clone, Copy)]
pub struct ChromaKeyOptions {
    /// Key color the background was generated with
    pub key_color: Rgb,
    /// Hue tolerance in degrees
    pub tolerance: u8,
}

/// Remove pixels matching the key color, in place
///
/// A pixel matches when its circular hue distance to the key is under
/// `tolerance` degrees and both saturation and value clear their guards.
/// Alpha scales continuously with match strength and the pixel's saturation
/// relative to the key's, and is only ever lowered.
///
/// # Errors
/// - `MattingError::InvalidBuffer` on a corrupt buffer; never fails otherwise
pub fn matte(image: &mut PixelBuffer, options: &ChromaKeyOptions) -> Result<()> {
    image.validate()?;

    let key = options.key_color;
    let (key_hue, key_sat, _) = rgb_to_hsv(key.r, key.g, key.b);
    let tolerance = f32::from(options.tolerance);

    let mut matched = 0usize;
    for y in 0..image.height {
        for x in 0..image.width {
            let [r, g, b, alpha] = image.get(x, y);
            let (hue, sat, value) = rgb_to_hsv(r, g, b);

            let distance = hue_distance(hue, key_hue);
            if distance >= tolerance || sat <= SATURATION_GUARD || value <= VALUE_GUARD {
                continue;
            }

            let strength = 1.0 - distance / tolerance;
            let sat_ratio = if key_sat <= f32::EPSILON {
                1.0
            } else {
                (sat / key_sat).min(1.0)
            };
            let computed = ((1.0 - strength * sat_ratio) * 255.0).round() as u8;
            image.set_alpha(x, y, alpha.min(computed));
            matched += 1;
        }
    }

    debug!(
        matched,
        key_hue,
        tolerance = options.tolerance,
        "chroma key matting applied"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(r: u8, g: u8, b: u8) -> PixelBuffer {
        let mut image = PixelBuffer::blank(2, 2);
        for y in 0..2 {
            for x in 0..2 {
                image.set_rgb(x, y, r, g, b);
                image.set_alpha(x, y, 255);
            }
        }
        image
    }

    fn magenta_options() -> ChromaKeyOptions {
        ChromaKeyOptions {
            key_color: Rgb::magenta(),
            tolerance: 20,
        }
    }

    #[test]
    fn test_exact_key_goes_fully_transparent() {
        let mut image = solid(255, 0, 255);
        matte(&mut image, &magenta_options()).unwrap();
        assert_eq!(image.get(0, 0)[3], 0);
    }

    #[test]
    fn test_distant_hue_untouched() {
        // Pure green is 180 degrees from magenta
        let mut image = solid(0, 255, 0);
        matte(&mut image, &magenta_options()).unwrap();
        assert_eq!(image.get(0, 0)[3], 255);
    }

    #[test]
    fn test_hue_wraps_across_zero() {
        // Key at hue ~350, pixel at hue ~5: circular distance 15, matches
        // with a 20 degree tolerance even though the linear distance is 345.
        let key = Rgb::new(255, 0, 42); // hue ~350
        let mut image = solid(255, 21, 0); // hue ~5
        let options = ChromaKeyOptions {
            key_color: key,
            tolerance: 20,
        };
        matte(&mut image, &options).unwrap();
        assert!(
            image.get(0, 0)[3] < 255,
            "wrapped hue should have matched and lowered alpha"
        );
    }

    #[test]
    fn test_dark_pixels_guarded() {
        // Very dark magenta-ish pixel: hue matches but value guard rejects
        let mut image = solid(50, 0, 50);
        matte(&mut image, &magenta_options()).unwrap();
        assert_eq!(image.get(0, 0)[3], 255);
    }

    #[test]
    fn test_gray_pixels_guarded() {
        // Saturation near zero: hue is meaningless, must not match
        let mut image = solid(200, 200, 200);
        matte(&mut image, &magenta_options()).unwrap();
        assert_eq!(image.get(0, 0)[3], 255);
    }

    #[test]
    fn test_alpha_only_lowered() {
        let mut image = solid(255, 0, 255);
        image.set_alpha(0, 0, 10);
        matte(&mut image, &magenta_options()).unwrap();
        assert_eq!(image.get(0, 0)[3], 0);
        // A weak match must not raise alpha above its current value
        let mut weak = solid(255, 80, 255); // near the tolerance edge
        weak.set_alpha(0, 0, 5);
        matte(&mut weak, &magenta_options()).unwrap();
        assert!(weak.get(0, 0)[3] <= 5);
    }

    #[test]
    fn test_corrupt_buffer_rejected() {
        let mut corrupt = PixelBuffer {
            width: 3,
            height: 3,
            pixels: vec![0; 4],
        };
        assert!(matte(&mut corrupt, &magenta_options()).is_err());
    }
}
