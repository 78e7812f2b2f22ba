//! Image Analyzer (§4.2), grounded on
//! `original_source/library/src/pngx_common.c`'s `prepare_quant_support`,
//! `extract_chroma_anchors`, and the stats accumulation inlined there.

use crate::color::{Rgba, color_distance_sq};
use crate::image::RgbaImage;
use crate::options::PngxOptions;

/// `{gradient_mean, gradient_max, saturation_mean, opaque_ratio,
/// translucent_ratio, vibrant_ratio}` — all normalized to `[0, 1]` (§3
/// "Image stats").
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageStats {
    pub gradient_mean: f32,
    pub gradient_max: f32,
    pub saturation_mean: f32,
    pub opaque_ratio: f32,
    pub translucent_ratio: f32,
    pub vibrant_ratio: f32,
}

/// Output of `analyze()`: stats plus optional importance map and derived
/// chroma anchors (§4.2).
pub struct AnalysisResult {
    pub stats: ImageStats,
    pub importance_map: Option<Vec<u8>>,
    pub anchors: Option<Vec<Rgba>>,
}

const CHROMA_ANCHOR_MIN_ALPHA: u8 = 64;
const CHROMA_ANCHOR_DEDUP_DISTANCE_SQ: u32 = 900;

#[derive(Default, Clone, Copy)]
struct Bucket {
    weight: f64,
    r_sum: f64,
    g_sum: f64,
    b_sum: f64,
    a_sum: f64,
    score: f64,
    count: u32,
}

/// `analyze(pixels, w, h, options) -> (stats, importance_map?, anchors?)`
/// (§4.2 public operation).
pub fn analyze(image: &RgbaImage, options: &PngxOptions) -> AnalysisResult {
    let w = image.width;
    let h = image.height;
    let n = image.pixel_count();

    if n == 0 {
        return AnalysisResult {
            stats: ImageStats::default(),
            importance_map: None,
            anchors: None,
        };
    }

    let luma: Vec<f32> = image.pixels.iter().map(|p| p.luma()).collect();

    let mut gradient_sum = 0f64;
    let mut gradient_max = 0f32;
    let mut saturation_sum = 0f64;
    let mut opaque = 0u32;
    let mut translucent = 0u32;
    let mut vibrant = 0u32;

    let mut raw_importance = vec![0u16; n];
    let mut buckets = vec![Bucket::default(); 16 * 16 * 16];

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            let p = image.pixels[idx];
            let y_here = luma[idx];
            let y_right = if x + 1 < w { luma[idx + 1] } else { y_here };
            let y_below = if y + 1 < h {
                luma[idx + w as usize]
            } else {
                y_here
            };
            let gradient = ((y_right - y_here).abs() + (y_below - y_here).abs()) / 510.0;
            let gradient = gradient.clamp(0.0, 1.0);
            gradient_sum += gradient as f64;
            gradient_max = gradient_max.max(gradient);

            let saturation = p.saturation();
            saturation_sum += saturation as f64;

            let alpha_factor = p.a as f32 / 255.0;

            if p.a > 248 {
                opaque += 1;
            } else if p.a > 8 {
                translucent += 1;
            }
            if saturation > 0.5 && gradient > 0.3 && alpha_factor > 0.8 {
                vibrant += 1;
            }

            let mut importance = gradient;
            if options.chroma_weight_enable {
                importance += saturation * 0.35;
            }
            if options.gradient_boost_enable {
                if gradient > 0.22 {
                    importance += 0.05 + gradient * 0.2;
                } else if gradient < 0.05 {
                    importance *= 0.6;
                }
            }
            if alpha_factor < 0.5 {
                importance *= 0.5 + alpha_factor;
            }
            importance = importance.clamp(0.0, 1.0);
            raw_importance[idx] = (importance * 65535.0 + 0.5).floor() as u16;

            if (saturation > 0.35 || importance > 0.5) && p.a > CHROMA_ANCHOR_MIN_ALPHA {
                let score = saturation as f64 * 0.6 + importance as f64 * 0.4;
                let bucket_idx =
                    ((p.r >> 4) as usize) << 8 | ((p.g >> 4) as usize) << 4 | (p.b >> 4) as usize;
                let bucket = &mut buckets[bucket_idx];
                bucket.weight += score;
                bucket.r_sum += p.r as f64 * score;
                bucket.g_sum += p.g as f64 * score;
                bucket.b_sum += p.b as f64 * score;
                bucket.a_sum += p.a as f64 * score;
                bucket.score += score;
                bucket.count += 1;
            }
        }
    }

    let stats = ImageStats {
        gradient_mean: (gradient_sum / n as f64) as f32,
        gradient_max,
        saturation_mean: (saturation_sum / n as f64) as f32,
        opaque_ratio: opaque as f32 / n as f32,
        translucent_ratio: translucent as f32 / n as f32,
        vibrant_ratio: vibrant as f32 / n as f32,
    };

    let importance_map = if options.saliency_map_enable {
        Some(normalize_importance(&raw_importance))
    } else {
        None
    };

    let anchors = if options.chroma_anchor_enable {
        Some(extract_anchors(&mut buckets, n))
    } else {
        None
    };

    AnalysisResult {
        stats,
        importance_map,
        anchors,
    }
}

fn normalize_importance(raw: &[u16]) -> Vec<u8> {
    let min = *raw.iter().min().unwrap_or(&0);
    let max = *raw.iter().max().unwrap_or(&0);
    let span = max.saturating_sub(min).max(1) as u32;
    raw.iter()
        .map(|&sample| {
            let scaled = ((sample.saturating_sub(min)) as u32 * 255) / span;
            scaled.max(8) as u8
        })
        .collect()
}

fn extract_anchors(buckets: &mut [Bucket], pixel_count: usize) -> Vec<Rgba> {
    let max_anchors = (pixel_count / 8192).clamp(4, 48);
    let mut anchors = Vec::with_capacity(max_anchors);

    for _ in 0..max_anchors {
        let Some((best_idx, best)) = buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| b.score > 0.0)
            .max_by(|(_, a), (_, b)| {
                let score_a = a.score * (1.0 + (a.weight / (a.count.max(1) as f64)).min(1.0))
                    / (1.0 + 0.02 * a.count as f64).max(1.0);
                let score_b = b.score * (1.0 + (b.weight / (b.count.max(1) as f64)).min(1.0))
                    / (1.0 + 0.02 * b.count as f64).max(1.0);
                score_a
                    .partial_cmp(&score_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, b)| (i, *b))
        else {
            break;
        };

        if best.weight <= 0.0 {
            break;
        }

        let color = Rgba::new(
            (best.r_sum / best.weight).round().clamp(0.0, 255.0) as u8,
            (best.g_sum / best.weight).round().clamp(0.0, 255.0) as u8,
            (best.b_sum / best.weight).round().clamp(0.0, 255.0) as u8,
            (best.a_sum / best.weight).round().clamp(0.0, 255.0) as u8,
        );

        let is_duplicate = anchors
            .iter()
            .any(|&a| color_distance_sq(a, color) <= CHROMA_ANCHOR_DEDUP_DISTANCE_SQ);
        buckets[best_idx].score = 0.0;
        if !is_duplicate {
            anchors.push(color);
        }
    }

    anchors
}
