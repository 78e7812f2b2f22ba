//! Lossless re-optimization, grounded on the teacher's
//! `optimizer.rs::configure_options` and
//! `original_source/library/src/pngx.c`'s `pngx_run_lossless_optimization`.

use std::num::NonZeroU8;

use oxipng::{Deflaters, Options, StripChunks};

use crate::error::{PngxError, Result};
use crate::options::PngxOptions;

/// Re-optimizes an already-encoded PNG blob losslessly via oxipng, honoring
/// `strip_safe`/`optimization_level` (§4.1, §6).
pub fn optimize(png_bytes: &[u8], options: &PngxOptions) -> Result<Vec<u8>> {
    let opts = configure_options(options);
    oxipng::optimize_from_memory(png_bytes, &opts)
        .map_err(|e| PngxError::EncodeFailed(e.to_string()))
}

fn configure_options(options: &PngxOptions) -> Options {
    let mut opts = match options.optimization_level {
        0 => Options::from_preset(0),
        level => Options::from_preset(level.min(6)),
    };
    opts.strip = if options.strip_safe {
        StripChunks::Safe
    } else {
        StripChunks::None
    };
    if options.optimization_level >= 5 {
        opts.deflate = Deflaters::Zopfli {
            iterations: NonZeroU8::new(15).expect("15 is non-zero"),
        };
    }
    opts
}
