//! Global brightness-threshold matting with color decontamination
//!
//! Simpler and faster than the flood fill, but not connectivity-aware: every
//! sufficiently white pixel goes transparent, including interior highlights.
//! Useful when the design is known to contain no near-white regions.

use crate::{
    error::Result,
    matting::flood_fill::is_whitish,
    types::PixelBuffer,
};
use tracing::debug;

/// Alpha below which a pixel counts as semi-transparent for decontamination
const DECONTAMINATION_ALPHA_CEILING: u8 = 250;
/// A channel above this still looks white enough to carry background fringe
const FRINGE_CHANNEL_FLOOR: u8 = 180;
/// Maximum square search radius for a replacement color
const DECONTAMINATION_RADIUS: u32 = 5;

/// Tunables for the threshold matter
#[derive(Debug, Clone, Copy)]
pub struct ThresholdOptions {
    /// A pixel goes transparent when all channels are `>= 255 - tolerance`
    pub tolerance: u8,
    /// Assign proportional alpha to near-threshold pixels
    pub edge_smoothing: bool,
    /// Replace whitish fringe colors on translucent pixels afterwards
    pub decontaminate: bool,
}

/// Remove every white-ish pixel regardless of connectivity, in place
///
/// # Errors
/// - `MattingError::InvalidBuffer` on a corrupt buffer; never fails otherwise
pub fn matte(image: &mut PixelBuffer, options: &ThresholdOptions) -> Result<()> {
    image.validate()?;

    let mut removed = 0usize;
    for y in 0..image.height {
        for x in 0..image.width {
            let [r, g, b, alpha] = image.get(x, y);
            if is_whitish(r, g, b, options.tolerance) {
                image.set_alpha(x, y, 0);
                removed += 1;
            } else if options.edge_smoothing {
                let brightness = ((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8;
                if brightness > 200 {
                    let fraction = f32::from(255 - brightness) / 55.0;
                    let computed = (fraction * 255.0).round().clamp(0.0, 255.0) as u8;
                    let computed = computed.max(50);
                    image.set_alpha(x, y, alpha.min(computed));
                }
            }
        }
    }

    debug!(removed, "threshold matting removed pixels");

    if options.decontaminate {
        decontaminate(image);
    }

    Ok(())
}

/// Strip residual background white from translucent edge pixels
///
/// For each semi-transparent pixel whose RGB is still whitish, scan an
/// expanding square perimeter (radius 1..=5) for the nearest opaque,
/// non-white pixel and copy its RGB. Alpha is untouched; without this the
/// matte shows a white halo when composited on a dark background.
fn decontaminate(image: &mut PixelBuffer) {
    let snapshot = image.clone();
    let mut replaced = 0usize;

    for y in 0..image.height {
        for x in 0..image.width {
            let [r, g, b, alpha] = snapshot.get(x, y);
            if alpha == 0 || alpha >= DECONTAMINATION_ALPHA_CEILING {
                continue;
            }
            if r <= FRINGE_CHANNEL_FLOOR
                || g <= FRINGE_CHANNEL_FLOOR
                || b <= FRINGE_CHANNEL_FLOOR
            {
                continue;
            }

            // Default to black when no donor exists within reach
            let (nr, ng, nb) =
                nearest_opaque_color(&snapshot, x, y).unwrap_or((0, 0, 0));
            image.set_rgb(x, y, nr, ng, nb);
            replaced += 1;
        }
    }

    if replaced > 0 {
        debug!(replaced, "decontaminated fringe pixels");
    }
}

/// Perimeter-only scan of expanding squares around `(cx, cy)`
fn nearest_opaque_color(image: &PixelBuffer, cx: u32, cy: u32) -> Option<(u8, u8, u8)> {
    let cx = i64::from(cx);
    let cy = i64::from(cy);
    let width = i64::from(image.width);
    let height = i64::from(image.height);

    for radius in 1..=i64::from(DECONTAMINATION_RADIUS) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                // Perimeter only; the interior was covered by smaller radii
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }
                let nx = cx + dx;
                let ny = cy + dy;
                if nx < 0 || ny < 0 || nx >= width || ny >= height {
                    continue;
                }
                let [r, g, b, alpha] = image.get(nx as u32, ny as u32);
                if alpha < DECONTAMINATION_ALPHA_CEILING {
                    continue;
                }
                if r > FRINGE_CHANNEL_FLOOR
                    && g > FRINGE_CHANNEL_FLOOR
                    && b > FRINGE_CHANNEL_FLOOR
                {
                    continue;
                }
                return Some((r, g, b));
            }
        }
    }
    None
}
