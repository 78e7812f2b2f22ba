//! Snap-to-bits primitives shared by the ReducedRGBA32 and LimitedRGBA4444
//! quantizers (§4.5, §4.6), grounded on
//! `original_source/library/src/pngx_common.c`'s
//! `quantize_channel_value`/`quantize_bits`/`snap_rgba_to_bits`.

use crate::color::Rgba;

/// Quantizes a single channel value (as `f32`, so error-diffusion deltas can
/// be folded in before rounding) to the nearest level of a uniform `2^bits`
/// grid spanning `[0, 255]` — the invariant checked in §8 "Reduced channel
/// quantization": `round(v * (2^k - 1) / 255) * 255 / (2^k - 1)`.
pub fn quantize_channel_value(value: f32, bits: u8) -> u8 {
    if bits >= 8 {
        return value.round().clamp(0.0, 255.0) as u8;
    }
    let levels = (1u32 << bits) - 1;
    let clamped = value.clamp(0.0, 255.0);
    let level = (clamped * levels as f32 / 255.0).round();
    ((level * 255.0) / levels as f32).round() as u8
}

/// Snaps every channel of a single color to `(bits_rgb, bits_alpha)`.
pub fn snap_rgba_to_bits(color: Rgba, bits_rgb: u8, bits_alpha: u8) -> Rgba {
    Rgba::new(
        quantize_channel_value(color.r as f32, bits_rgb),
        quantize_channel_value(color.g as f32, bits_rgb),
        quantize_channel_value(color.b as f32, bits_rgb),
        quantize_channel_value(color.a as f32, bits_alpha),
    )
    .canonicalize()
}

/// Snaps an entire image buffer in place to `(bits_rgb, bits_alpha)`.
pub fn snap_image_to_bits(pixels: &mut [Rgba], bits_rgb: u8, bits_alpha: u8) {
    for p in pixels.iter_mut() {
        *p = snap_rgba_to_bits(*p, bits_rgb, bits_alpha);
    }
}

/// Grid capacity: product of per-channel level counts, capped at 32768
/// (§4.5 step 3, GLOSSARY "Grid capacity").
pub fn grid_capacity(bits_rgb: u8, bits_alpha: u8) -> u32 {
    let exponent = 3u32 * bits_rgb as u32 + bits_alpha as u32;
    if exponent >= 15 {
        32768
    } else {
        1u32 << exponent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_channel_is_grid_aligned() {
        for bits in 1..=8u8 {
            for v in 0..=255u16 {
                let q = quantize_channel_value(v as f32, bits);
                let levels = if bits >= 8 { 255 } else { (1u32 << bits) - 1 };
                if bits < 8 {
                    let level = (q as u32 * levels) as f32 / 255.0;
                    assert!((level - level.round()).abs() < 1e-3);
                }
            }
        }
    }

    #[test]
    fn grid_capacity_caps_at_32768() {
        assert_eq!(grid_capacity(8, 8), 32768);
        assert_eq!(grid_capacity(4, 4), 32768); // 3*4+4=16 -> capped
        assert_eq!(grid_capacity(3, 2), 1 << 11);
    }

    #[test]
    fn snap_canonicalizes_transparent_pixels() {
        let c = Rgba::new(200, 150, 100, 0);
        let snapped = snap_rgba_to_bits(c, 4, 4);
        assert_eq!(snapped, Rgba::new(0, 0, 0, 0));
    }
}
