use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use image::Rgb32FImage;
use log::info;

use blur::BlurStrategy;
use cli::{init_logging, Args};
use conversion::{normalize, to_rgb8};
use error::BloomError;
use pipeline::render_bloom;

mod blur;
mod cli;
mod composite;
mod conversion;
mod error;
mod luminance;
mod pipeline;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level);

    let img_in = image::open(&args.input)
        .map_err(|err| BloomError::InvalidInput(format!("cannot open image: {err}")))
        .with_context(|| format!("reading {}", args.input.display()))?;

    info!("image input size : {} x {}", img_in.width(), img_in.height());

    let img = normalize(&img_in);
    let outputs = render_bloom(&img, &args.bloom_options())?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    if args.save_intermediates {
        save(&outputs.light_sources, &args.output_dir, "Light Sources.png")?;
    }

    for result in &outputs.results {
        let (final_name, background_name) = match result.strategy {
            BlurStrategy::Gaussian => ("01 - Gaussian.png", "Background Blur Gaussian.png"),
            BlurStrategy::Box => ("02 - Box Bloom.png", "Background Blur BoxBlur.png"),
        };
        save(&result.composite, &args.output_dir, final_name)?;
        if args.save_intermediates {
            save(&result.accumulated, &args.output_dir, background_name)?;
        }
    }

    info!("Bloom effect applied and images saved.");
    Ok(())
}

fn save(image: &Rgb32FImage, dir: &Path, name: &str) -> Result<()> {
    let path = dir.join(name);
    to_rgb8(image)
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!("saved {}", path.display());
    Ok(())
}
