//! Palette256 quantizer (§4.4), grounded on
//! `original_source/library/src/pngx_palette256.c`.
//!
//! The two-phase `prepare`/`finalize` split in the original exists only to
//! let the bridge engine run between them against a process-wide context
//! (`g_palette256_ctx`). Per §9 "Process-wide palette256 context" this is
//! collapsed into a single owned `Palette256Job` value and one entry point,
//! `quantize`.

use imagequant::RGBA;

use crate::analyzer::{self, ImageStats};
use crate::color::{Rgba, color_distance_sq};
use crate::error::{PngxError, Result};
use crate::image::{self, RgbaImage};
use crate::options::PngxOptions;

const POSTPROCESS_MAX_COLOR_DISTANCE_SQ: u32 = 2500;
const POSTPROCESS_DISABLE_DITHER_THRESHOLD: f32 = 0.7;
const FIXED_PALETTE_CAP: usize = 96;
const ANCHOR_DEDUP_DISTANCE_SQ: u32 = 900;

pub struct Palette256Output {
    pub png_bytes: Vec<u8>,
    pub quality: i32,
}

/// Single-call entry point replacing the original's `prepare`/`finalize`
/// pair (§9).
pub fn quantize(image: &RgbaImage, options: &PngxOptions) -> Result<Palette256Output> {
    let mut pixels = image.pixels.clone();

    if options.palette256_alpha_bleed_enable {
        alpha_bleed_rgb_from_opaque(&mut pixels, image.width, image.height, options);
    }

    let bled_image = RgbaImage {
        width: image.width,
        height: image.height,
        pixels: pixels.clone(),
    };
    let analysis = analyzer::analyze(&bled_image, options);
    let stats = analysis.stats;

    let prefer_uniform = options.palette256_gradient_profile_enable
        && is_smooth_gradient_profile(&stats, options);

    let mut tuned = options.clone();
    let importance_map = if prefer_uniform {
        tuned.saliency_map_enable = false;
        tuned.chroma_anchor_enable = false;
        tuned.postprocess_smooth_enable = false;
        None
    } else {
        analysis.importance_map
    };

    let fixed_colors = if prefer_uniform {
        Vec::new()
    } else {
        build_fixed_palette(options, analysis.anchors.as_deref().unwrap_or(&[]))
    };

    let mut resolved_dither = resolve_quant_dither(options, &stats);
    if options.dither_level.is_none() {
        let estimated = estimate_bitdepth_dither_level(&pixels, image.width, image.height, 8);
        if estimated > resolved_dither {
            resolved_dither = estimated;
        }
    }
    let gradient_floor = tuned.palette256_gradient_profile_dither_floor.unwrap_or(0.78);
    if prefer_uniform && resolved_dither < gradient_floor {
        resolved_dither = gradient_floor;
    }

    let (speed, quality_min, quality_max) = tune_quant_params_for_image(
        &tuned,
        &stats,
        tuned.speed as i32,
        tuned.quality_min,
        tuned.quality_max,
    );

    let (palette, indices, quality) = run_bridge_quantize(
        &pixels,
        image.width,
        image.height,
        speed,
        quality_min,
        quality_max,
        tuned.max_colors,
        resolved_dither,
        importance_map.as_deref(),
        &fixed_colors,
    )?;

    let mut palette: Vec<Rgba> = palette
        .into_iter()
        .map(|c| Rgba::new(c.r, c.g, c.b, c.a).canonicalize())
        .collect();
    sanitize_transparent_palette(&mut palette);

    let mut indices = indices;
    if tuned.postprocess_smooth_enable
        && resolved_dither < POSTPROCESS_DISABLE_DITHER_THRESHOLD
        && importance_map.is_some()
    {
        postprocess_indices(
            &mut indices,
            image.width,
            image.height,
            &palette,
            importance_map.as_deref().unwrap(),
            tuned.postprocess_smooth_importance_cutoff,
        );
    }

    let png_bytes = image::encode_indexed_png(image.width, image.height, &indices, &palette)?;

    Ok(Palette256Output {
        png_bytes,
        quality,
    })
}

fn is_smooth_gradient_profile(stats: &ImageStats, opts: &PngxOptions) -> bool {
    stats.opaque_ratio > opts.palette256_profile_opaque_ratio_threshold
        && stats.gradient_mean < opts.palette256_profile_gradient_mean_max
        && stats.saturation_mean < opts.palette256_profile_saturation_mean_max
}

fn build_fixed_palette(opts: &PngxOptions, anchors: &[Rgba]) -> Vec<Rgba> {
    let mut fixed = opts.protected_colors.clone();
    for &anchor in anchors {
        if fixed.len() >= FIXED_PALETTE_CAP {
            break;
        }
        let is_close = fixed
            .iter()
            .any(|&c| color_distance_sq(c, anchor) <= ANCHOR_DEDUP_DISTANCE_SQ);
        if !is_close {
            fixed.push(anchor);
        }
    }
    fixed
}

fn resolve_quant_dither(opts: &PngxOptions, stats: &ImageStats) -> f32 {
    let base = match opts.dither_level {
        Some(v) => v,
        None => {
            let mut d = 0.3 + stats.gradient_mean * 0.6 + stats.saturation_mean * 0.3;
            if stats.opaque_ratio < 0.7 {
                d -= 0.15;
            }
            d
        }
    };
    base.clamp(0.05, 0.95)
}

fn tune_quant_params_for_image(
    opts: &PngxOptions,
    stats: &ImageStats,
    speed: i32,
    quality_min: u8,
    quality_max: u8,
) -> (i32, u8, u8) {
    if stats.opaque_ratio > opts.palette256_tune_opaque_ratio_threshold
        && stats.gradient_mean < opts.palette256_tune_gradient_mean_max
        && stats.saturation_mean < opts.palette256_tune_saturation_mean_max
    {
        let speed_max = if opts.palette256_tune_speed_max < 0 {
            2
        } else {
            opts.palette256_tune_speed_max
        };
        let qmax_target = if opts.palette256_tune_quality_max_target < 0 {
            95
        } else {
            opts.palette256_tune_quality_max_target
        } as u8;
        let qmin_floor = if opts.palette256_tune_quality_min_floor < 0 {
            85
        } else {
            opts.palette256_tune_quality_min_floor
        } as u8;

        let new_speed = speed.min(speed_max);
        let mut new_max = quality_max.max(qmax_target);
        let mut new_min = quality_min.max(qmin_floor);
        if new_min > new_max {
            new_min = new_max;
        }
        (new_speed, new_min, new_max)
    } else {
        (speed, quality_min, quality_max)
    }
}

fn sanitize_transparent_palette(palette: &mut [Rgba]) {
    for c in palette.iter_mut() {
        if c.a == 0 {
            c.r = 0;
            c.g = 0;
            c.b = 0;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_bridge_quantize(
    pixels: &[Rgba],
    width: u32,
    height: u32,
    speed: i32,
    quality_min: u8,
    quality_max: u8,
    max_colors: u32,
    dither_level: f32,
    importance_map: Option<&[u8]>,
    fixed_colors: &[Rgba],
) -> Result<(Vec<RGBA>, Vec<u8>, i32)> {
    let rgba_pixels: Vec<RGBA> = pixels.iter().map(|p| RGBA::new(p.r, p.g, p.b, p.a)).collect();

    let attempt = |qmin: u8, qmax: u8| -> Result<(Vec<RGBA>, Vec<u8>, i32)> {
        let mut attr = imagequant::new();
        attr.set_quality(qmin, qmax)
            .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
        attr.set_max_colors(max_colors)
            .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
        attr.set_speed(speed)
            .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
        if !fixed_colors.is_empty() {
            for c in fixed_colors {
                let _ = attr.add_fixed_color(RGBA::new(c.r, c.g, c.b, c.a));
            }
        }

        let mut liq_image = attr
            .new_image(rgba_pixels.clone(), width as usize, height as usize, 0.0)
            .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
        if let Some(map) = importance_map {
            let _ = liq_image.set_importance_map(map);
        }
        let mut result = attr
            .quantize(&mut liq_image)
            .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
        result
            .set_dithering_level(dither_level)
            .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
        let quality = result.quantization_quality().map(|q| q as i32).unwrap_or(-1);
        let (palette, indices) = result
            .remapped(&mut liq_image)
            .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
        Ok((palette, indices, quality))
    };

    match attempt(quality_min, quality_max) {
        Ok(out) => Ok(out),
        Err(_) if quality_min > 0 => {
            log::debug!("PNGX: Relaxed quantization quality floor");
            attempt(0, quality_max.max(1))
        }
        Err(e) => Err(e),
    }
}

fn postprocess_indices(
    indices: &mut [u8],
    width: u32,
    height: u32,
    palette: &[Rgba],
    importance_map: &[u8],
    cutoff: Option<f32>,
) {
    let w = width as usize;
    let h = height as usize;
    if importance_map.len() < w * h {
        return;
    }
    let reference = indices.to_vec();
    let cutoff = cutoff.unwrap_or(-1.0);

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let base_color = reference[idx];
            let importance = importance_map[idx];
            if cutoff >= 0.0 && (importance as f32 / 255.0) >= cutoff {
                continue;
            }

            let mut neighbors = Vec::with_capacity(4);
            if x > 0 {
                neighbors.push(reference[idx - 1]);
            }
            if x + 1 < w {
                neighbors.push(reference[idx + 1]);
            }
            if y > 0 {
                neighbors.push(reference[idx - w]);
            }
            if y + 1 < h {
                neighbors.push(reference[idx + w]);
            }
            if neighbors.len() < 3 {
                continue;
            }

            let candidate = neighbors[0];
            if !neighbors.iter().all(|&n| n == candidate) {
                continue;
            }
            if candidate == base_color {
                continue;
            }
            if neighbors.contains(&base_color) {
                continue;
            }

            let base = base_color as usize;
            let cand = candidate as usize;
            if base < palette.len() && cand < palette.len() {
                let dist = color_distance_sq(palette[base], palette[cand]);
                if dist > POSTPROCESS_MAX_COLOR_DISTANCE_SQ {
                    continue;
                }
            }

            indices[idx] = candidate;
        }
    }
}

/// Alpha bleed (§4.4 pre-phase step 1): replaces undefined RGB of
/// mostly-transparent pixels with the nearest opaque neighbor's RGB via a
/// three-pass multi-direction Chamfer-like distance transform.
fn alpha_bleed_rgb_from_opaque(pixels: &mut [Rgba], width: u32, height: u32, opts: &PngxOptions) {
    if width == 0 || height == 0 {
        return;
    }
    let w = width as usize;
    let h = height as usize;
    let n = w * h;
    let max_distance = opts.palette256_alpha_bleed_max_distance;
    let opaque_threshold = opts.palette256_alpha_bleed_opaque_threshold;
    let soft_limit = opts.palette256_alpha_bleed_soft_limit;

    let mut dist = vec![u16::MAX; n];
    let mut seed = vec![Rgba::default(); n];
    let mut has_seed = false;

    for i in 0..n {
        if pixels[i].a == 0 {
            pixels[i].r = 0;
            pixels[i].g = 0;
            pixels[i].b = 0;
        }
        if pixels[i].a >= opaque_threshold {
            dist[i] = 0;
            seed[i] = pixels[i];
            has_seed = true;
        }
    }
    if !has_seed {
        return;
    }

    for _ in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let idx = y * w + x;
                let mut best = dist[idx];
                let mut best_rgb = seed[idx];
                let mut consider = |n_idx: usize, best: &mut u16, best_rgb: &mut Rgba| {
                    if dist[n_idx] != u16::MAX && dist[n_idx] + 1 < *best {
                        *best = dist[n_idx] + 1;
                        *best_rgb = seed[n_idx];
                    }
                };
                if x > 0 {
                    consider(idx - 1, &mut best, &mut best_rgb);
                }
                if y > 0 {
                    consider(idx - w, &mut best, &mut best_rgb);
                }
                if x > 0 && y > 0 {
                    consider(idx - w - 1, &mut best, &mut best_rgb);
                }
                if x + 1 < w && y > 0 {
                    consider(idx - w + 1, &mut best, &mut best_rgb);
                }
                dist[idx] = best;
                seed[idx] = best_rgb;
            }
        }

        for y in (0..h).rev() {
            for x in (0..w).rev() {
                let idx = y * w + x;
                let mut best = dist[idx];
                let mut best_rgb = seed[idx];
                let mut consider = |n_idx: usize, best: &mut u16, best_rgb: &mut Rgba| {
                    if dist[n_idx] != u16::MAX && dist[n_idx] + 1 < *best {
                        *best = dist[n_idx] + 1;
                        *best_rgb = seed[n_idx];
                    }
                };
                if x + 1 < w {
                    consider(idx + 1, &mut best, &mut best_rgb);
                }
                if y + 1 < h {
                    consider(idx + w, &mut best, &mut best_rgb);
                }
                if x + 1 < w && y + 1 < h {
                    consider(idx + w + 1, &mut best, &mut best_rgb);
                }
                if x > 0 && y + 1 < h {
                    consider(idx + w - 1, &mut best, &mut best_rgb);
                }
                dist[idx] = best;
                seed[idx] = best_rgb;
            }
        }
    }

    for i in 0..n {
        if pixels[i].a <= soft_limit && dist[i] != u16::MAX && dist[i] <= max_distance {
            pixels[i].r = seed[i].r;
            pixels[i].g = seed[i].g;
            pixels[i].b = seed[i].b;
        }
    }
}

/// Cheap auto-dither heuristic shared in spirit with §4.6's; grounded on
/// `pngx_common.c::estimate_bitdepth_dither_level`.
fn estimate_bitdepth_dither_level(pixels: &[Rgba], width: u32, height: u32, bits: u8) -> f32 {
    if pixels.is_empty() || bits >= 8 {
        return 0.0;
    }
    let mut max_channel_delta = 0u32;
    let w = width as usize;
    for y in 0..height as usize {
        for x in 0..w {
            let idx = y * w + x;
            let p = pixels[idx];
            if x + 1 < w {
                let q = pixels[idx + 1];
                max_channel_delta = max_channel_delta
                    .max((p.r as i32 - q.r as i32).unsigned_abs())
                    .max((p.g as i32 - q.g as i32).unsigned_abs())
                    .max((p.b as i32 - q.b as i32).unsigned_abs());
            }
        }
    }
    if max_channel_delta < 6 {
        0.55
    } else {
        0.05
    }
}
