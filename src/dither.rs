//! Serpentine Floyd–Steinberg error diffusion (§9 "Error-diffusion state"),
//! grounded on `original_source/library/src/pngx_limited4444.c`'s
//! `process_bitdepth_pixel`/`reduce_rgba_bitdepth_dither`.
//!
//! Two rolling row buffers of `f32` deltas are swapped each scanline; the
//! scan direction alternates and the neighbor-offset signs for the
//! diagonal/forward taps flip with it. Alpha is excluded from diffusion so
//! visibility noise never couples into the RGB channels (§4.5 step 2).

use crate::color::Rgba;
use crate::snap::quantize_channel_value;

/// Per-pixel bit width and dither-strength hook. `bits_rgb`/`bits_alpha`
/// and `dither_level` (already scaled by callers, e.g. by
/// `alpha_factor * importance_scale` in §4.5 step 2) are resolved per pixel
/// so the Reduced quantizer can drive spatially-varying bit depth while the
/// LimitedRGBA4444 quantizer drives a single uniform width.
pub trait DitherPixelParams {
    fn bits_rgb(&self, index: usize) -> u8;
    fn bits_alpha(&self, index: usize) -> u8;
    fn dither_level(&self, index: usize) -> f32;
    /// If true, this pixel's RGB keeps full precision and no error is
    /// diffused into it (§4.5 step 2: `A <= 8` pixels).
    fn skip_rgb_precision(&self, _index: usize) -> bool {
        false
    }
}

/// Uniform parameters: same bit width and dither level for every pixel,
/// used by the LimitedRGBA4444 quantizer (§4.6).
pub struct UniformParams {
    pub bits_rgb: u8,
    pub bits_alpha: u8,
    pub dither_level: f32,
}

impl DitherPixelParams for UniformParams {
    fn bits_rgb(&self, _index: usize) -> u8 {
        self.bits_rgb
    }
    fn bits_alpha(&self, _index: usize) -> u8 {
        self.bits_alpha
    }
    fn dither_level(&self, _index: usize) -> f32 {
        self.dither_level
    }
}

/// Applies serpentine Floyd–Steinberg diffusion in place over `pixels`
/// (row-major, `width * height` long), driven per-pixel by `params`.
pub fn diffuse(pixels: &mut [Rgba], width: u32, height: u32, params: &impl DitherPixelParams) {
    if width == 0 || height == 0 {
        return;
    }
    let w = width as usize;
    let mut err_curr = vec![0f32; w * 3];
    let mut err_next = vec![0f32; w * 3];

    for y in 0..height as usize {
        let left_to_right = y % 2 == 0;
        err_next.iter_mut().for_each(|v| *v = 0.0);

        let xs: Box<dyn Iterator<Item = usize>> = if left_to_right {
            Box::new(0..w)
        } else {
            Box::new((0..w).rev())
        };

        for x in xs {
            let idx = y * w + x;
            let bits_rgb = params.bits_rgb(idx);
            let bits_alpha = params.bits_alpha(idx);
            let dither_level = params.dither_level(idx);
            let skip = params.skip_rgb_precision(idx);

            let mut pixel = pixels[idx];
            let err_index = x * 3;

            if !(skip || bits_rgb >= 8) {
                let channels = [pixel.r, pixel.g, pixel.b];
                let mut quantized = [0u8; 3];
                for c in 0..3 {
                    // A pixel opting out of its own dithering (dither_level
                    // <= 0) also ignores error diffused in from neighbors,
                    // so it quantizes as a plain snap regardless of scan
                    // order (needed so a protected color always lands on
                    // its own locked grid point, §4.5 step 2).
                    let value = if dither_level <= 0.0 {
                        channels[c] as f32
                    } else {
                        channels[c] as f32 + err_curr[err_index + c]
                    };
                    let q = quantize_channel_value(value, bits_rgb);
                    quantized[c] = q;
                    let error = (value - q as f32) * dither_level;
                    if dither_level <= 0.0 || error == 0.0 {
                        continue;
                    }
                    diffuse_error(
                        &mut err_curr,
                        &mut err_next,
                        err_index,
                        c,
                        x,
                        y as u32,
                        width,
                        height,
                        error,
                        left_to_right,
                    );
                }
                pixel.r = quantized[0];
                pixel.g = quantized[1];
                pixel.b = quantized[2];
            }

            pixel.a = quantize_channel_value(pixel.a as f32, bits_alpha);
            pixels[idx] = pixel.canonicalize();
        }

        std::mem::swap(&mut err_curr, &mut err_next);
    }
}

#[allow(clippy::too_many_arguments)]
fn diffuse_error(
    err_curr: &mut [f32],
    err_next: &mut [f32],
    err_index: usize,
    channel: usize,
    x: usize,
    y: u32,
    width: u32,
    height: u32,
    error: f32,
    left_to_right: bool,
) {
    let w = width as usize;
    if left_to_right {
        if x + 1 < w {
            err_curr[err_index + 3 + channel] += error * (7.0 / 16.0);
        }
        if y + 1 < height {
            if x > 0 {
                err_next[err_index - 3 + channel] += error * (3.0 / 16.0);
            }
            err_next[err_index + channel] += error * (5.0 / 16.0);
            if x + 1 < w {
                err_next[err_index + 3 + channel] += error * (1.0 / 16.0);
            }
        }
    } else {
        if x > 0 {
            err_curr[err_index - 3 + channel] += error * (7.0 / 16.0);
        }
        if y + 1 < height {
            if x + 1 < w {
                err_next[err_index + 3 + channel] += error * (3.0 / 16.0);
            }
            err_next[err_index + channel] += error * (5.0 / 16.0);
            if x > 0 {
                err_next[err_index - 3 + channel] += error * (1.0 / 16.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dither_keeps_alpha_undithered_and_grid_aligned() {
        let mut pixels = vec![Rgba::new(10, 130, 250, 128); 16];
        let params = UniformParams {
            bits_rgb: 4,
            bits_alpha: 4,
            dither_level: 1.0,
        };
        diffuse(&mut pixels, 4, 4, &params);
        for p in &pixels {
            assert_eq!(quantize_channel_value(p.a as f32, 4), p.a);
        }
    }

    #[test]
    fn zero_dither_behaves_like_plain_snap() {
        let mut pixels = vec![Rgba::new(77, 200, 5, 255); 9];
        let params = UniformParams {
            bits_rgb: 4,
            bits_alpha: 4,
            dither_level: 0.0,
        };
        diffuse(&mut pixels, 3, 3, &params);
        let expected = crate::snap::snap_rgba_to_bits(Rgba::new(77, 200, 5, 255), 4, 4);
        assert!(pixels.iter().all(|&p| p == expected));
    }

    struct PerPixelDither {
        zero_at: usize,
    }

    impl DitherPixelParams for PerPixelDither {
        fn bits_rgb(&self, _index: usize) -> u8 {
            4
        }
        fn bits_alpha(&self, _index: usize) -> u8 {
            4
        }
        fn dither_level(&self, index: usize) -> f32 {
            if index == self.zero_at { 0.0 } else { 1.0 }
        }
    }

    #[test]
    fn zero_dither_pixel_ignores_incoming_neighbor_error() {
        let mut pixels = vec![Rgba::new(10, 10, 10, 255); 4];
        pixels[3] = Rgba::new(240, 5, 5, 255);
        let params = PerPixelDither { zero_at: 3 };
        diffuse(&mut pixels, 2, 2, &params);
        let expected = crate::snap::snap_rgba_to_bits(Rgba::new(240, 5, 5, 255), 4, 4);
        assert_eq!(pixels[3], expected);
    }
}
