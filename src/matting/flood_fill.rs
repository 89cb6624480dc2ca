//! Border-connected flood-fill matting
//!
//! The default (`Auto`) method. A global threshold would erase white
//! highlights inside the design; seeding the fill from the border instead
//! guarantees that only background connected to the image edge is removed,
//! while interior white regions stay opaque.

use crate::{
    error::Result,
    types::PixelBuffer,
};
use tracing::debug;

/// Brightness above which an edge pixel is eligible for smoothing
const SMOOTHING_BRIGHTNESS_FLOOR: u8 = 200;
/// Minimum alpha assigned by smoothing; avoids harsh cutoffs
const SMOOTHING_ALPHA_FLOOR: u8 = 50;

/// Tunables for the flood-fill matter
#[derive(Debug, Clone, Copy)]
pub struct FloodFillOptions {
    /// A pixel is white-ish when all channels are `>= 255 - tolerance`
    pub tolerance: u8,
    /// Run the edge-smoothing pass after removal
    pub edge_smoothing: bool,
}

/// Is this pixel close enough to white to count as background?
///
/// Boundary is inclusive: a channel exactly at `255 - tolerance` matches.
#[inline]
#[must_use]
pub fn is_whitish(r: u8, g: u8, b: u8, tolerance: u8) -> bool {
    let threshold = 255 - tolerance;
    r >= threshold && g >= threshold && b >= threshold
}

/// Remove the white background connected to the image border, in place
///
/// 1. Seed an iterative 4-connected flood fill from every border pixel.
/// 2. Visit only white-ish, unvisited pixels; mark each for removal.
/// 3. Set alpha 0 on all marked pixels.
/// 4. Optionally soften bright opaque pixels adjacent to transparency.
///
/// Uses an explicit stack: recursion would overflow on large images.
/// O(W*H) time and visited-set space.
///
/// # Errors
/// - `MattingError::InvalidBuffer` on a corrupt buffer; never fails otherwise
pub fn matte(image: &mut PixelBuffer, options: &FloodFillOptions) -> Result<()> {
    image.validate()?;

    let width = image.width;
    let height = image.height;
    let mut visited = vec![false; width as usize * height as usize];
    let mut remove = vec![false; width as usize * height as usize];
    let mut stack: Vec<(u32, u32)> = Vec::new();

    // Seed from all four edges
    for x in 0..width {
        stack.push((x, 0));
        stack.push((x, height - 1));
    }
    for y in 0..height {
        stack.push((0, y));
        stack.push((width - 1, y));
    }

    let mut removed = 0usize;
    while let Some((x, y)) = stack.pop() {
        let index = (y * width + x) as usize;
        if visited[index] {
            continue;
        }
        visited[index] = true;

        let [r, g, b, _] = image.get(x, y);
        if !is_whitish(r, g, b, options.tolerance) {
            continue;
        }
        remove[index] = true;
        removed += 1;

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    for y in 0..height {
        for x in 0..width {
            if remove[(y * width + x) as usize] {
                image.set_alpha(x, y, 0);
            }
        }
    }

    debug!(
        removed,
        total = width as usize * height as usize,
        "flood fill removed border-connected background"
    );

    if options.edge_smoothing {
        smooth_edges(image, &remove);
    }

    Ok(())
}

/// Feather bright opaque pixels that border fully transparent ones
///
/// Alpha is proportional to `(255 - brightness) / 55`, floored at
/// `SMOOTHING_ALPHA_FLOOR`, and never raised above the existing alpha.
fn smooth_edges(image: &mut PixelBuffer, removed: &[bool]) {
    let width = image.width;
    let height = image.height;

    let mut updates: Vec<(u32, u32, u8)> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let index = (y * width + x) as usize;
            if removed[index] {
                continue;
            }
            let [r, g, b, alpha] = image.get(x, y);
            if alpha == 0 {
                continue;
            }

            let next_to_hole = (x > 0 && removed[index - 1])
                || (x + 1 < width && removed[index + 1])
                || (y > 0 && removed[index - width as usize])
                || (y + 1 < height && removed[index + width as usize]);
            if !next_to_hole {
                continue;
            }

            let brightness =
                ((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8;
            if brightness <= SMOOTHING_BRIGHTNESS_FLOOR {
                continue;
            }

            let fraction = f32::from(255 - brightness) / 55.0;
            let computed = (fraction * 255.0).round().clamp(0.0, 255.0) as u8;
            let computed = computed.max(SMOOTHING_ALPHA_FLOOR);
            updates.push((x, y, alpha.min(computed)));
        }
    }

    for (x, y, alpha) in updates {
        image.set_alpha(x, y, alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 7x7 image: white everywhere, with a dark ring isolating a white
    /// interior pixel at the center.
    fn ringed_image() -> PixelBuffer {
        let mut image = PixelBuffer::blank(7, 7);
        for y in 0..7 {
            for x in 0..7 {
                image.set_rgb(x, y, 255, 255, 255);
                image.set_alpha(x, y, 255);
            }
        }
        // Dark ring around (3,3)
        for (x, y) in [
            (2, 2),
            (3, 2),
            (4, 2),
            (2, 3),
            (4, 3),
            (2, 4),
            (3, 4),
            (4, 4),
        ] {
            image.set_rgb(x, y, 40, 40, 40);
        }
        image
    }

    fn options() -> FloodFillOptions {
        FloodFillOptions {
            tolerance: 15,
            edge_smoothing: false,
        }
    }

    #[test]
    fn test_interior_white_island_survives() {
        let mut image = ringed_image();
        matte(&mut image, &options()).unwrap();

        // Border-connected white is gone
        assert_eq!(image.get(0, 0)[3], 0);
        assert_eq!(image.get(6, 6)[3], 0);
        assert_eq!(image.get(3, 0)[3], 0);

        // The ring and the enclosed white pixel stay opaque
        assert_eq!(image.get(2, 2)[3], 255);
        assert_eq!(image.get(3, 3)[3], 255, "interior white must survive");
    }

    #[test]
    fn test_idempotent_on_matted_image() {
        let mut image = ringed_image();
        matte(&mut image, &options()).unwrap();
        let first_pass = image.clone();

        matte(&mut image, &options()).unwrap();
        assert_eq!(image, first_pass);
    }

    #[test]
    fn test_whitish_boundary_inclusive() {
        let tolerance = 15;
        let threshold = 255 - tolerance; // 240
        assert!(is_whitish(threshold, threshold, threshold, tolerance));
        assert!(!is_whitish(threshold - 1, threshold, threshold, tolerance));
        assert!(is_whitish(255, 255, 255, tolerance));
    }

    #[test]
    fn test_explicit_stack_survives_large_image() {
        // Recursion would blow the stack on a fully white image this size
        let mut image = PixelBuffer::blank(512, 512);
        for i in 0..image.pixels.len() {
            image.pixels[i] = 255;
        }
        matte(&mut image, &options()).unwrap();
        assert_eq!(image.get(256, 256)[3], 0);
    }

    #[test]
    fn test_edge_smoothing_softens_bright_border_pixels() {
        // White background, bright (not whitish) block in the middle
        let mut image = PixelBuffer::blank(5, 5);
        for y in 0..5 {
            for x in 0..5 {
                image.set_rgb(x, y, 255, 255, 255);
                image.set_alpha(x, y, 255);
            }
        }
        for (x, y) in [(2, 2), (2, 3), (3, 2), (3, 3)] {
            image.set_rgb(x, y, 230, 230, 230);
        }

        let smoothing = FloodFillOptions {
            tolerance: 15,
            edge_smoothing: true,
        };
        matte(&mut image, &smoothing).unwrap();

        // brightness 230 -> (255-230)/55 * 255 = 116
        let alpha = image.get(2, 2)[3];
        assert!(alpha > 0 && alpha < 255, "expected partial alpha, got {alpha}");
        assert_eq!(alpha, 116);
    }

    #[test]
    fn test_smoothing_never_raises_alpha() {
        let mut image = PixelBuffer::blank(3, 3);
        for y in 0..3 {
            for x in 0..3 {
                image.set_rgb(x, y, 255, 255, 255);
                image.set_alpha(x, y, 255);
            }
        }
        // Center is bright but already nearly transparent
        image.set_rgb(1, 1, 230, 230, 230);
        image.set_alpha(1, 1, 30);

        let smoothing = FloodFillOptions {
            tolerance: 15,
            edge_smoothing: true,
        };
        matte(&mut image, &smoothing).unwrap();
        assert_eq!(image.get(1, 1)[3], 30);
    }

    #[test]
    fn test_corrupt_buffer_rejected() {
        let mut corrupt = PixelBuffer {
            width: 4,
            height: 4,
            pixels: vec![0; 7],
        };
        assert!(matte(&mut corrupt, &options()).is_err());
    }
}
