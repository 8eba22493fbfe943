use image::{DynamicImage, Rgb, Rgb32FImage, RgbImage};

const MAX_LEVEL: f32 = 255.0;

/// Decoded image to normalised RGB floats in [0, 1].
pub fn normalize(image: &DynamicImage) -> Rgb32FImage {
    let rgb = image.to_rgb8();
    Rgb32FImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        Rgb(rgb.get_pixel(x, y).0.map(|v| v as f32 / MAX_LEVEL))
    })
}

/// Saturating 8-bit encode: every channel is clamped to [0, 1] before rescaling.
pub fn to_rgb8(image: &Rgb32FImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        Rgb(image
            .get_pixel(x, y)
            .0
            .map(|v| (v.clamp(0.0, 1.0) * MAX_LEVEL).round() as u8))
    })
}
