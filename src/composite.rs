use image::{ImageBuffer, Rgb, Rgb32FImage};
use nalgebra::Vector3;

use crate::error::{ensure_same_dimensions, Result};

pub const ORIGINAL_WEIGHT: f32 = 0.9;
pub const BLOOM_WEIGHT: f32 = 0.2;

/// `0.9 * original + 0.2 * accumulated` per channel.
///
/// The weights are not normalised, so results above 1.0 are expected and are kept as
/// they are. Saturation happens when the image is encoded.
pub fn composite(original: &Rgb32FImage, accumulated: &Rgb32FImage) -> Result<Rgb32FImage> {
    ensure_same_dimensions(original.dimensions(), accumulated.dimensions())?;

    Ok(ImageBuffer::from_fn(
        original.width(),
        original.height(),
        |x, y| {
            let base = Vector3::from(original.get_pixel(x, y).0);
            let glow = Vector3::from(accumulated.get_pixel(x, y).0);
            let mixed = base * ORIGINAL_WEIGHT + glow * BLOOM_WEIGHT;
            Rgb([mixed.x, mixed.y, mixed.z])
        },
    ))
}
