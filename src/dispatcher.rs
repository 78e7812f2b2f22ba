//! Strategy Dispatcher (§4.3), grounded on
//! `original_source/library/src/pngx.c`'s `pngx_run_quantization`.

use crate::error::Result;
use crate::image::RgbaImage;
use crate::options::{LossyType, PngxOptions};
use crate::{limited4444, palette256, reduced};

/// Encoded bytes plus which strategy actually produced them.
pub struct QuantizedOutput {
    pub png_bytes: Vec<u8>,
    pub strategy: LossyType,
}

/// Runs whichever quantizer `options.lossy_type` selects. Returns `Ok(None)`
/// when lossy encoding is disabled or the strategy simply produced no
/// output; a hard error only reaches the caller when the chosen quantizer
/// cannot proceed at all (§4.3 "Failure semantics").
pub fn run(image: &RgbaImage, options: &PngxOptions) -> Result<Option<QuantizedOutput>> {
    if !options.lossy_enable {
        return Ok(None);
    }

    let result = match options.lossy_type {
        LossyType::Palette256 => palette256::quantize(image, options).map(|o| o.png_bytes),
        LossyType::LimitedRgba4444 => limited4444::quantize(image, options).map(|o| o.png_bytes),
        LossyType::ReducedRgba32 => reduced::quantize(image, options).map(|o| o.png_bytes),
    };

    match result {
        Ok(png_bytes) => Ok(Some(QuantizedOutput {
            png_bytes,
            strategy: options.lossy_type,
        })),
        Err(err) => {
            log::warn!("PNGX: lossy quantization failed, falling back to lossless-only: {err}");
            Ok(None)
        }
    }
}
