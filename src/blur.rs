use std::time::Instant;

use image::Rgb32FImage;
use log::{debug, trace};
use nalgebra::DVector;
use rayon::prelude::*;

use crate::error::{ensure_non_empty, ensure_same_dimensions, BloomError, Result};

const CHANNELS: usize = 3;
const MAX_LEVELS: u32 = 32;

/// How the light mask is spread over increasing radii.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurStrategy {
    Gaussian,
    Box,
}

impl BlurStrategy {
    pub fn name(self) -> &'static str {
        match self {
            BlurStrategy::Gaussian => "gaussian",
            BlurStrategy::Box => "box",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlurSchedule {
    pub levels: u32,              // number of radius levels accumulated, numbered from 1
    pub gaussian_support: u32,    // side of the Gaussian sample window, same for every level
    pub gaussian_sigma_base: f32, // level i uses sigma = base^i
    pub box_base_size: u32,       // level i uses a box of side base * i
    pub box_passes: u32,          // box passes chained per level
}

impl Default for BlurSchedule {
    fn default() -> Self {
        Self {
            levels: 3,
            gaussian_support: 75,
            gaussian_sigma_base: 4.0,
            box_base_size: 15,
            box_passes: 3,
        }
    }
}

impl BlurSchedule {
    pub fn validate(&self) -> Result<()> {
        if self.levels == 0 || self.levels > MAX_LEVELS {
            return Err(BloomError::InvalidConfiguration(format!(
                "blur levels must be within 1..={MAX_LEVELS}, got {}",
                self.levels
            )));
        }
        if self.gaussian_support == 0 {
            return Err(BloomError::InvalidConfiguration(
                "gaussian support must be positive".into(),
            ));
        }
        if !(self.gaussian_sigma_base.is_finite() && self.gaussian_sigma_base > 0.0) {
            return Err(BloomError::InvalidConfiguration(format!(
                "gaussian sigma base {} must be positive",
                self.gaussian_sigma_base
            )));
        }
        if self.box_base_size == 0 {
            return Err(BloomError::InvalidConfiguration(
                "box size must be positive".into(),
            ));
        }
        if self.box_passes == 0 {
            return Err(BloomError::InvalidConfiguration(
                "at least one box pass is required".into(),
            ));
        }
        let top_sigma = self.sigma(self.levels);
        if !(top_sigma.is_finite() && top_sigma > 0.0) {
            return Err(BloomError::InvalidConfiguration(format!(
                "sigma {top_sigma} for level {} is out of range",
                self.levels
            )));
        }
        if self.box_base_size.checked_mul(self.levels).is_none() {
            return Err(BloomError::InvalidConfiguration(format!(
                "box size for level {} overflows",
                self.levels
            )));
        }
        Ok(())
    }

    pub fn sigma(&self, level: u32) -> f32 {
        self.gaussian_sigma_base.powi(level as i32)
    }

    pub fn box_size(&self, level: u32) -> u32 {
        self.box_base_size * level
    }
}

/// Normalised 1-D Gaussian weights over `support` samples centred on the window.
///
/// When every weight underflows (a sigma far below one sample) the kernel collapses
/// to a unit impulse at the anchor, the limit of the Gaussian as sigma goes to zero.
pub fn gaussian_kernel(support: u32, sigma: f32) -> Result<DVector<f32>> {
    if support == 0 {
        return Err(BloomError::InvalidConfiguration(
            "kernel support must be positive".into(),
        ));
    }
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(BloomError::InvalidConfiguration(format!(
            "sigma {sigma} must be positive"
        )));
    }

    let center = (support - 1) as f32 / 2.0;
    let denom = 2.0 * sigma * sigma;
    let weights = DVector::from_fn(support as usize, |i, _| {
        let d = i as f32 - center;
        (-(d * d) / denom).exp()
    });
    let total = weights.sum();
    if !(total.is_finite() && total > 0.0) {
        let anchor = support as usize / 2;
        return Ok(DVector::from_fn(support as usize, |i, _| {
            if i == anchor {
                1.0
            } else {
                0.0
            }
        }));
    }
    Ok(weights / total)
}

/// Separable Gaussian blur with a `support` x `support` window. Samples outside the
/// image replicate the nearest edge pixel.
pub fn gaussian_blur(image: &Rgb32FImage, support: u32, sigma: f32) -> Result<Rgb32FImage> {
    ensure_non_empty(image.dimensions())?;
    let kernel = gaussian_kernel(support, sigma)?;
    Ok(separable(image, |src, width| convolve_rows(src, width, &kernel)))
}

/// Mean over a `size` x `size` window anchored at `size / 2`, with edge replication.
pub fn box_blur(image: &Rgb32FImage, size: u32) -> Result<Rgb32FImage> {
    ensure_non_empty(image.dimensions())?;
    if size == 0 {
        return Err(BloomError::InvalidConfiguration(
            "box size must be positive".into(),
        ));
    }
    Ok(separable(image, |src, width| {
        box_rows(src, width, size as usize)
    }))
}

/// Sum of `light_mask` blurred once per level of `schedule`.
///
/// Every level starts from the unmodified mask, so levels are computed in parallel and
/// summed in level order afterwards. The returned accumulator is not yet composited.
pub fn bloom_blur(
    original: &Rgb32FImage,
    light_mask: &Rgb32FImage,
    strategy: BlurStrategy,
    schedule: &BlurSchedule,
) -> Result<Rgb32FImage> {
    ensure_non_empty(original.dimensions())?;
    ensure_same_dimensions(original.dimensions(), light_mask.dimensions())?;
    schedule.validate()?;

    let levels: Vec<Rgb32FImage> = (1..=schedule.levels)
        .into_par_iter()
        .map(|level| -> Result<Rgb32FImage> {
            let start = Instant::now();
            let blurred = blur_level(light_mask, strategy, schedule, level)?;
            debug!(
                "{} level {level} done in {:.2?}",
                strategy.name(),
                start.elapsed()
            );
            Ok(blurred)
        })
        .collect::<Result<_>>()?;

    let (width, height) = light_mask.dimensions();
    let mut accumulator = Rgb32FImage::new(width, height);
    for blurred in &levels {
        add_assign(&mut accumulator, blurred)?;
    }
    Ok(accumulator)
}

fn blur_level(
    light_mask: &Rgb32FImage,
    strategy: BlurStrategy,
    schedule: &BlurSchedule,
    level: u32,
) -> Result<Rgb32FImage> {
    match strategy {
        BlurStrategy::Gaussian => {
            let sigma = schedule.sigma(level);
            trace!(
                "gaussian level {level}: support {}, sigma {sigma}",
                schedule.gaussian_support
            );
            gaussian_blur(light_mask, schedule.gaussian_support, sigma)
        }
        BlurStrategy::Box => {
            let size = schedule.box_size(level);
            trace!(
                "box level {level}: size {size}, {} passes",
                schedule.box_passes
            );
            let mut blurred = light_mask.clone();
            for _ in 0..schedule.box_passes {
                blurred = box_blur(&blurred, size)?;
            }
            Ok(blurred)
        }
    }
}

fn add_assign(accumulator: &mut Rgb32FImage, image: &Rgb32FImage) -> Result<()> {
    ensure_same_dimensions(accumulator.dimensions(), image.dimensions())?;
    let target: &mut [f32] = accumulator;
    target
        .par_iter_mut()
        .zip(image.as_raw().par_iter())
        .for_each(|(acc, &v)| *acc += v);
    Ok(())
}

fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Horizontal pass, then the same pass over the transposed result for the vertical
/// direction.
fn separable<F>(image: &Rgb32FImage, pass: F) -> Rgb32FImage
where
    F: Fn(&[f32], usize) -> Vec<f32>,
{
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);

    let horizontal = pass(image.as_raw(), w);
    let vertical = pass(&transpose(&horizontal, w, h), h);

    let mut out = Rgb32FImage::new(width, height);
    transpose_into(&vertical, h, w, &mut out);
    out
}

fn transpose(src: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut out = vec![0.0; src.len()];
    transpose_into(src, width, height, &mut out);
    out
}

fn transpose_into(src: &[f32], width: usize, height: usize, dst: &mut [f32]) {
    dst.par_chunks_mut(height * CHANNELS)
        .enumerate()
        .for_each(|(x, row)| {
            for y in 0..height {
                let s = (y * width + x) * CHANNELS;
                row[y * CHANNELS..(y + 1) * CHANNELS].copy_from_slice(&src[s..s + CHANNELS]);
            }
        });
}

fn convolve_rows(src: &[f32], width: usize, kernel: &DVector<f32>) -> Vec<f32> {
    let anchor = (kernel.len() / 2) as isize;
    let mut out = vec![0.0; src.len()];

    out.par_chunks_mut(width * CHANNELS)
        .zip(src.par_chunks(width * CHANNELS))
        .for_each(|(dst, row)| {
            for x in 0..width {
                let mut acc = [0.0f32; CHANNELS];
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = clamp_index(x as isize + k as isize - anchor, width) * CHANNELS;
                    for c in 0..CHANNELS {
                        acc[c] += w * row[sx + c];
                    }
                }
                dst[x * CHANNELS..(x + 1) * CHANNELS].copy_from_slice(&acc);
            }
        });
    out
}

// Sliding window sum, so the cost per pixel does not grow with `size`.
fn box_rows(src: &[f32], width: usize, size: usize) -> Vec<f32> {
    let anchor = (size / 2) as isize;
    let span = size as isize;
    let scale = 1.0 / size as f64;
    let mut out = vec![0.0; src.len()];

    out.par_chunks_mut(width * CHANNELS)
        .zip(src.par_chunks(width * CHANNELS))
        .for_each(|(dst, row)| {
            for c in 0..CHANNELS {
                let at = |i: isize| row[clamp_index(i, width) * CHANNELS + c] as f64;

                let mut sum: f64 = (-anchor..span - anchor).map(at).sum();
                for x in 0..width as isize {
                    dst[x as usize * CHANNELS + c] = (sum * scale) as f32;
                    sum += at(x - anchor + span) - at(x - anchor);
                }
            }
        });
    out
}
