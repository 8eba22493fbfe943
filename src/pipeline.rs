use std::time::Instant;

use image::Rgb32FImage;
use log::info;
use rayon::prelude::*;

use crate::blur::{bloom_blur, BlurSchedule, BlurStrategy};
use crate::composite::composite;
use crate::error::{ensure_non_empty, BloomError, Result};
use crate::luminance::extract_light_sources;

#[derive(Debug, Clone, PartialEq)]
pub struct BloomOptions {
    pub threshold: f32,                // luminance at or above which a pixel counts as a light source
    pub strategies: Vec<BlurStrategy>, // blur engines to run, outputs keep this order
    pub schedule: BlurSchedule,        // radius levels shared by both engines
}

impl Default for BloomOptions {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            strategies: vec![BlurStrategy::Gaussian, BlurStrategy::Box],
            schedule: BlurSchedule::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyOutput {
    pub strategy: BlurStrategy,
    pub accumulated: Rgb32FImage, // blurred light before compositing
    pub composite: Rgb32FImage,
}

#[derive(Debug, Clone)]
pub struct BloomOutputs {
    pub light_sources: Rgb32FImage,
    pub results: Vec<StrategyOutput>,
}

/// Extract the light sources once, then blur and composite them with every selected
/// strategy. Strategies share only the read-only source and mask, so they run in
/// parallel, each with its own accumulator.
pub fn render_bloom(image: &Rgb32FImage, options: &BloomOptions) -> Result<BloomOutputs> {
    ensure_non_empty(image.dimensions())?;
    options.schedule.validate()?;
    if options.strategies.is_empty() {
        return Err(BloomError::InvalidConfiguration(
            "no blur strategy selected".into(),
        ));
    }

    info!(
        "rendering bloom on {} x {} image, threshold {}",
        image.width(),
        image.height(),
        options.threshold
    );

    let light_sources = extract_light_sources(image, options.threshold)?;

    let results = options
        .strategies
        .par_iter()
        .map(|&strategy| -> Result<StrategyOutput> {
            let start = Instant::now();
            let accumulated = bloom_blur(image, &light_sources, strategy, &options.schedule)?;
            let composite = composite(image, &accumulated)?;
            info!("{} bloom done in {:.2?}", strategy.name(), start.elapsed());
            Ok(StrategyOutput {
                strategy,
                accumulated,
                composite,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BloomOutputs {
        light_sources,
        results,
    })
}
