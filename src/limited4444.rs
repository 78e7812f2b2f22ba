//! LimitedRGBA4444 quantizer (§4.6), grounded on
//! `original_source/library/src/pngx_limited4444.c`.

use crate::dither::{UniformParams, diffuse};
use crate::error::Result;
use crate::image::RgbaImage;
use crate::options::PngxOptions;

pub struct Limited4444Output {
    pub png_bytes: Vec<u8>,
}

/// Fixed per-channel bit width for LimitedRGBA4444 (§4.6, GLOSSARY
/// "PNGX_LIMITED_RGBA4444_BITS").
const PNGX_LIMITED_RGBA4444_BITS: u8 = 4;

pub fn quantize(image: &RgbaImage, options: &PngxOptions) -> Result<Limited4444Output> {
    let mut pixels = image.pixels.clone();

    let dither_level = match options.dither_level {
        Some(v) => v,
        None => estimate_bitdepth_dither_level(&pixels, image.width, image.height),
    };

    // LimitedRGBA4444 is a fixed uniform 4-bit-per-channel reduction (hence
    // "4444"): the bit width is the module's own constant, never derived
    // from `reduced_bits_rgb`/`reduced_alpha_bits`, which only parameterize
    // ReducedRGBA32 (§4.5 step 1).
    let params = UniformParams {
        bits_rgb: PNGX_LIMITED_RGBA4444_BITS,
        bits_alpha: PNGX_LIMITED_RGBA4444_BITS,
        dither_level,
    };

    diffuse(&mut pixels, image.width, image.height, &params);

    let reduced = RgbaImage {
        width: image.width,
        height: image.height,
        pixels,
    };
    let png_bytes = reduced.encode_rgba()?;

    Ok(Limited4444Output { png_bytes })
}

/// Grounded on `pngx_limited4444.c`'s `estimate_bitdepth_dither_level`:
/// baseline ~0.05, raised toward ~0.55 for broad-coverage/soft-gradient
/// images, scaled down by translucent coverage, boosted when alpha is
/// nearly everywhere opaque.
fn estimate_bitdepth_dither_level(
    pixels: &[crate::color::Rgba],
    width: u32,
    height: u32,
) -> f32 {
    if pixels.is_empty() {
        return 0.05;
    }
    let w = width as usize;
    let h = height as usize;
    let mut smooth_transitions = 0u32;
    let mut total_transitions = 0u32;
    let mut opaque = 0u32;
    let mut translucent = 0u32;

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let p = pixels[idx];
            if p.a > 248 {
                opaque += 1;
            } else if p.a > 8 {
                translucent += 1;
            }
            if x + 1 < w {
                total_transitions += 1;
                let q = pixels[idx + 1];
                let delta = (p.r as i32 - q.r as i32).unsigned_abs()
                    + (p.g as i32 - q.g as i32).unsigned_abs()
                    + (p.b as i32 - q.b as i32).unsigned_abs();
                if delta < 18 {
                    smooth_transitions += 1;
                }
            }
        }
    }

    let smooth_ratio = if total_transitions > 0 {
        smooth_transitions as f32 / total_transitions as f32
    } else {
        0.0
    };
    let translucent_ratio = translucent as f32 / pixels.len() as f32;
    let opaque_ratio = opaque as f32 / pixels.len() as f32;

    let mut level = 0.05 + smooth_ratio * 0.5;
    level *= 1.0 - translucent_ratio * 0.5;
    if opaque_ratio > 0.95 {
        level += 0.05;
    }
    level.clamp(0.05, 0.55)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::options::{RawPngxOptions, normalize};

    #[test]
    fn flat_image_quantizes_without_error() {
        let image = RgbaImage {
            width: 4,
            height: 4,
            pixels: vec![Rgba::new(120, 60, 200, 255); 16],
        };
        let opts = normalize(&RawPngxOptions::default());
        let output = quantize(&image, &opts).expect("quantize succeeds");
        assert!(!output.png_bytes.is_empty());
    }

    #[test]
    fn dither_estimate_stays_in_bounds() {
        let pixels = vec![Rgba::new(10, 10, 10, 255); 64];
        let level = estimate_bitdepth_dither_level(&pixels, 8, 8);
        assert!((0.05..=0.55).contains(&level));
    }
}
