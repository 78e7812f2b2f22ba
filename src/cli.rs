use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};

use crate::options::{LossyType, RawPngxOptions};

/// Command-line interface definition (§6 "CLI surface").
#[derive(Debug, Parser)]
#[command(author, version, about = "Adaptive lossy/lossless PNG optimizer", long_about = None)]
pub struct Cli {
    /// One or more PNG file paths (files or directories are expanded).
    #[arg(required = true, value_name = "PATH", num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Which lossy quantization strategy to try alongside lossless
    /// re-optimization.
    #[arg(long, value_enum, default_value_t = LossyStrategy::Palette256)]
    pub strategy: LossyStrategy,

    /// Disable lossy quantization entirely (lossless re-optimization only).
    #[arg(long, default_value_t = false, action = ArgAction::SetTrue)]
    pub lossless_only: bool,

    /// Retain all ancillary metadata chunks instead of stripping them.
    #[arg(long, default_value_t = false, action = ArgAction::SetTrue)]
    pub keep_metadata: bool,

    /// Allow overwriting existing output files in place.
    #[arg(long, default_value_t = false, action = ArgAction::SetTrue)]
    pub overwrite: bool,

    /// Limit the number of worker threads (defaults to logical CPU count).
    #[arg(long, value_parser = clap::value_parser!(NonZeroUsize))]
    pub threads: Option<NonZeroUsize>,

    /// Disable the fancy progress UI and emit plain log lines instead.
    #[arg(long, default_value_t = false, action = ArgAction::SetTrue)]
    pub no_progress: bool,

    /// Preview actions without writing any files.
    #[arg(long, default_value_t = false, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Lower bound of the acceptable palette quantization quality window.
    #[arg(long, value_name = "0-100", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality_min: Option<u8>,

    /// Upper bound of the acceptable palette quantization quality window.
    #[arg(long, value_name = "0-100", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality_max: Option<u8>,

    /// Explicit color budget for ReducedRGBA32 (defaults to auto).
    #[arg(long, value_name = "COLORS")]
    pub reduced_colors: Option<u32>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum LossyStrategy {
    Palette256,
    Limited4444,
    Reduced32,
}

impl From<LossyStrategy> for LossyType {
    fn from(strategy: LossyStrategy) -> Self {
        match strategy {
            LossyStrategy::Palette256 => LossyType::Palette256,
            LossyStrategy::Limited4444 => LossyType::LimitedRgba4444,
            LossyStrategy::Reduced32 => LossyType::ReducedRgba32,
        }
    }
}

/// Derived configuration passed to the pipeline.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub inputs: Vec<PathBuf>,
    pub common: CommonOptions,
    pub pngx_options: RawPngxOptions,
}

#[derive(Debug, Clone)]
pub struct CommonOptions {
    pub keep_metadata: bool,
    pub overwrite: bool,
    pub threads: Option<NonZeroUsize>,
    pub progress: ProgressKind,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ProgressKind {
    Fancy,
    Quiet,
}

impl Cli {
    pub fn build(self) -> Result<AppConfig> {
        if self.inputs.is_empty() {
            bail!("at least one PNG path must be provided");
        }

        let inputs = self
            .inputs
            .into_iter()
            .map(|path| {
                if path.exists() {
                    Ok(path)
                } else {
                    bail!("input path {:?} does not exist", path)
                }
            })
            .collect::<Result<Vec<PathBuf>>>()
            .context("validating input paths")?;

        let common = CommonOptions {
            keep_metadata: self.keep_metadata,
            overwrite: self.overwrite,
            threads: self.threads,
            progress: if self.no_progress {
                ProgressKind::Quiet
            } else {
                ProgressKind::Fancy
            },
            dry_run: self.dry_run,
        };

        let mut pngx_options = RawPngxOptions::default();
        pngx_options.strip_safe = !self.keep_metadata;
        pngx_options.lossy_enable = !self.lossless_only;
        pngx_options.lossy_type = self.strategy.into();
        if let Some(threads) = self.threads {
            pngx_options.threads = threads.get() as i32;
        }
        if let Some(quality_min) = self.quality_min {
            pngx_options.quality_min = quality_min as i32;
        }
        if let Some(quality_max) = self.quality_max {
            pngx_options.quality_max = quality_max as i32;
        }
        if let Some(reduced_colors) = self.reduced_colors {
            pngx_options.reduced_colors = Some(reduced_colors as i32);
        }

        Ok(AppConfig {
            inputs,
            common,
            pngx_options,
        })
    }
}
