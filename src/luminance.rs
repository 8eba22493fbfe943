use image::{ImageBuffer, Luma, Rgb, Rgb32FImage};
use log::debug;
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::error::{ensure_non_empty, BloomError, Result};

/// Single channel brightness map, one value per source pixel.
pub type LuminanceMap = ImageBuffer<Luma<f32>, Vec<f32>>;

const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

pub fn luma(pixel: &Rgb<f32>) -> f32 {
    Vector3::new(LUMA_R, LUMA_G, LUMA_B).dot(&Vector3::from(pixel.0))
}

pub fn luminance_map(image: &Rgb32FImage) -> LuminanceMap {
    ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma(image.get_pixel(x, y))])
    })
}

/// Keep every pixel whose luminance is at or above `threshold` and zero the rest.
///
/// The test is a hard cut: a kept pixel retains its full colour, a rejected one
/// becomes black. The source image is left untouched.
pub fn extract_light_sources(image: &Rgb32FImage, threshold: f32) -> Result<Rgb32FImage> {
    ensure_non_empty(image.dimensions())?;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(BloomError::InvalidConfiguration(format!(
            "threshold {threshold} is outside [0, 1]"
        )));
    }

    let luminance = luminance_map(image);
    let mut light_sources = image.clone();

    let kept: usize = light_sources
        .par_chunks_mut(3)
        .zip(luminance.as_raw().par_iter())
        .map(|(pixel, &l)| {
            if l < threshold {
                pixel.fill(0.0);
                0
            } else {
                1
            }
        })
        .sum();

    debug!(
        "light sources: {kept} of {} pixels at or above {threshold}",
        luminance.len()
    );

    Ok(light_sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_image(rng: &mut StdRng, width: u32, height: u32, max: f32) -> Rgb32FImage {
        ImageBuffer::from_fn(width, height, |_, _| {
            Rgb([
                rng.gen_range(0.0..max),
                rng.gen_range(0.0..max),
                rng.gen_range(0.0..max),
            ])
        })
    }

    #[test]
    fn grey_pixel_luma_is_its_value() {
        assert!((luma(&Rgb([0.5, 0.5, 0.5])) - 0.5).abs() < 1e-6);
        assert!((luma(&Rgb([0.0, 0.0, 1.0])) - LUMA_B).abs() < 1e-6);
    }

    #[test]
    fn zero_threshold_is_identity() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            let image = random_image(&mut rng, 13, 9, 1.0);
            let light = extract_light_sources(&image, 0.0).unwrap();
            assert_eq!(light, image);
        }
    }

    #[test]
    fn max_threshold_rejects_everything_below_white() {
        let mut rng = StdRng::seed_from_u64(11);
        let image = random_image(&mut rng, 8, 8, 0.99);
        let light = extract_light_sources(&image, 1.0).unwrap();
        assert!(light.as_raw().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn pixels_are_either_kept_or_zeroed() {
        let mut rng = StdRng::seed_from_u64(3);
        let image = random_image(&mut rng, 20, 15, 1.0);
        let light = extract_light_sources(&image, 0.5).unwrap();

        for ((src, out), l) in image
            .pixels()
            .zip(light.pixels())
            .zip(luminance_map(&image).pixels())
        {
            if l.0[0] < 0.5 {
                assert_eq!(out.0, [0.0; 3]);
            } else {
                assert_eq!(out, src);
            }
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let image = Rgb32FImage::from_pixel(2, 2, Rgb([0.25, 0.25, 0.25]));
        let at = luma(&Rgb([0.25, 0.25, 0.25]));
        let light = extract_light_sources(&image, at).unwrap();
        assert_eq!(light, image);
    }

    #[test]
    fn single_bright_pixel_survives() {
        let mut image = Rgb32FImage::from_pixel(4, 4, Rgb([0.1, 0.1, 0.1]));
        image.put_pixel(1, 2, Rgb([1.0, 1.0, 1.0]));

        let light = extract_light_sources(&image, 0.4).unwrap();

        for (x, y, pixel) in light.enumerate_pixels() {
            if (x, y) == (1, 2) {
                assert_eq!(pixel.0, [1.0, 1.0, 1.0]);
            } else {
                assert_eq!(pixel.0, [0.0; 3]);
            }
        }
    }

    #[test]
    fn rejects_bad_threshold_and_empty_image() {
        let image = Rgb32FImage::new(2, 2);
        assert!(matches!(
            extract_light_sources(&image, 1.5),
            Err(BloomError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            extract_light_sources(&image, -0.1),
            Err(BloomError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            extract_light_sources(&Rgb32FImage::new(0, 3), 0.4),
            Err(BloomError::InvalidInput(_))
        ));
    }
}
