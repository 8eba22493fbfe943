use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::blur::BlurStrategy;
use crate::pipeline::BloomOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Gaussian,
    Box,
    Both,
}

/// Render a bloom effect on a still image.
#[derive(Parser, Debug)]
#[command(name = "bloom-rendering", version)]
pub struct Args {
    /// Image to read.
    #[arg(default_value = "example.png")]
    pub input: PathBuf,

    /// Luminance in [0, 1] at or above which a pixel is treated as a light source.
    #[arg(short, long, default_value_t = 0.4)]
    pub threshold: f32,

    /// Blur strategy used to spread the light.
    #[arg(short, long, value_enum, default_value_t = StrategyArg::Both)]
    pub strategy: StrategyArg,

    /// Directory the rendered images are written to.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Also write the light-source mask and each blurred background.
    #[arg(long)]
    pub save_intermediates: bool,

    /// Log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}

impl Args {
    pub fn bloom_options(&self) -> BloomOptions {
        let strategies = match self.strategy {
            StrategyArg::Gaussian => vec![BlurStrategy::Gaussian],
            StrategyArg::Box => vec![BlurStrategy::Box],
            StrategyArg::Both => vec![BlurStrategy::Gaussian, BlurStrategy::Box],
        };
        BloomOptions {
            threshold: self.threshold,
            strategies,
            ..BloomOptions::default()
        }
    }
}

pub fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_run() {
        let args = Args::parse_from(["bloom-rendering"]);
        assert_eq!(args.input, PathBuf::from("example.png"));
        assert_eq!(args.log_level, LevelFilter::Info);
        assert!(!args.save_intermediates);
        assert_eq!(args.bloom_options(), BloomOptions::default());
    }

    #[test]
    fn overrides_reach_options() {
        let args = Args::parse_from([
            "bloom-rendering",
            "mine.png",
            "--threshold",
            "0.6",
            "--strategy",
            "box",
            "--output-dir",
            "out",
            "--save-intermediates",
            "--log-level",
            "debug",
        ]);
        let options = args.bloom_options();
        assert_eq!(args.input, PathBuf::from("mine.png"));
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert_eq!(args.log_level, LevelFilter::Debug);
        assert!(args.save_intermediates);
        assert_eq!(options.threshold, 0.6);
        assert_eq!(options.strategies, vec![BlurStrategy::Box]);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(Args::try_parse_from(["bloom-rendering", "--strategy", "median"]).is_err());
    }
}
