//! ReducedRGBA32 quantizer (§4.5), grounded on
//! `original_source/library/src/pngx_reduced.c`'s median-cut + k-means
//! pipeline (`build_histogram`, `split_color_box`, `assign_to_centroids`,
//! `refine_centroids`, `resolve_reduced_rgba32_target`, and the
//! `grid_passthrough` shortcut at lines 1868-1889/2199-2206).

use std::collections::{HashMap, HashSet};

use crate::analyzer::{self, ImageStats};
use crate::color::{Rgba, color_distance_sq};
use crate::dither::{DitherPixelParams, diffuse};
use crate::error::{PngxError, Result};
use crate::image::RgbaImage;
use crate::options::PngxOptions;
use crate::snap::{grid_capacity, snap_rgba_to_bits};

pub struct ReducedOutput {
    pub png_bytes: Vec<u8>,
    pub colors_used: usize,
    /// Per-pixel `bits_rgb` actually used during the pre-pass diffusion
    /// (§4.5 step 2's per-pixel boost), kept for diagnostics/tuning.
    pub detail_bits_rgb: Vec<u8>,
}

/// Per-pixel bit-depth/dither parameters driven by the importance map
/// (§4.5 step 2): important regions get a stepwise RGB bit-depth boost and
/// a weaker dither; near-transparent pixels keep full RGB precision.
/// Pixels whose original color is a protected color (§3) are pinned to the
/// base grid with no dither, so they always land exactly on their own
/// locked histogram entry rather than a finer, boosted grid point.
struct VaryingParams<'a> {
    base_bits_rgb: u8,
    base_bits_alpha: u8,
    importance: &'a [u8],
    alphas: &'a [u8],
    base_dither: f32,
    protected: &'a [bool],
}

/// Stepwise RGB bit-depth boost: +3 at importance >= 224, +2 at >= 200,
/// +1 at >= 160, no boost below that (§4.5 step 2).
fn bit_boost_for_importance(importance: u8) -> u8 {
    if importance >= 224 {
        3
    } else if importance >= 200 {
        2
    } else if importance >= 160 {
        1
    } else {
        0
    }
}

impl DitherPixelParams for VaryingParams<'_> {
    fn bits_rgb(&self, index: usize) -> u8 {
        if self.protected.get(index).copied().unwrap_or(false) {
            return self.base_bits_rgb;
        }
        let importance = self.importance.get(index).copied().unwrap_or(128);
        (self.base_bits_rgb + bit_boost_for_importance(importance)).min(8)
    }

    fn bits_alpha(&self, _index: usize) -> u8 {
        self.base_bits_alpha
    }

    fn dither_level(&self, index: usize) -> f32 {
        if self.protected.get(index).copied().unwrap_or(false) {
            return 0.0;
        }
        let importance = self.importance.get(index).copied().unwrap_or(128) as f32;
        let alpha_factor = self.alphas.get(index).copied().unwrap_or(255) as f32 / 255.0;
        let importance_scale = 0.5 + (1.0 - importance / 255.0) * 0.5;
        self.base_dither * alpha_factor * importance_scale
    }

    fn skip_rgb_precision(&self, index: usize) -> bool {
        self.alphas.get(index).copied().unwrap_or(255) <= 8
    }
}

/// A weighted histogram entry over the reduced grid. `locked` entries
/// correspond to `options.protected_colors` (§3 "Histogram entry") and
/// must never be merged away by median-cut or k-means.
struct HistogramEntry {
    color: Rgba,
    weight: u64,
    locked: bool,
}

/// Top-level ReducedRGBA32 entry point (§4.5). Performs a pre-pass
/// bit-reduction with error diffusion, builds a weighted/locked histogram
/// over the reduced grid, grows a palette by median-cut box splitting,
/// refines it with a bounded k-means pass, auto-trims duplicate centroids,
/// then remaps every pixel to its nearest centroid.
pub fn quantize(image: &RgbaImage, options: &PngxOptions) -> Result<ReducedOutput> {
    if image.pixel_count() == 0 {
        return Err(PngxError::InvalidParameter("empty image".into()));
    }

    let analysis = analyzer::analyze(image, options);
    let stats = analysis.stats;
    let importance = analysis
        .importance_map
        .unwrap_or_else(|| vec![128u8; image.pixel_count()]);

    let (bits_rgb, bits_alpha) = tune_bitdepth(&image.pixels, options, &stats);
    let detail_bits_rgb: Vec<u8> = importance
        .iter()
        .map(|&imp| (bits_rgb + bit_boost_for_importance(imp)).min(8))
        .collect();
    let alphas: Vec<u8> = image.pixels.iter().map(|p| p.a).collect();
    let protected: Vec<bool> = image
        .pixels
        .iter()
        .map(|p| options.protected_colors.contains(p))
        .collect();

    let base_dither = options.dither_level.unwrap_or(0.4);
    let mut pixels = image.pixels.clone();
    let params = VaryingParams {
        base_bits_rgb: bits_rgb,
        base_bits_alpha: bits_alpha,
        importance: &importance,
        alphas: &alphas,
        base_dither,
        protected: &protected,
    };
    diffuse(&mut pixels, image.width, image.height, &params);

    let capacity = grid_capacity(bits_rgb, bits_alpha);

    let locked_colors: Vec<Rgba> = {
        let mut colors: Vec<Rgba> = options
            .protected_colors
            .iter()
            .map(|&c| snap_rgba_to_bits(c, bits_rgb, bits_alpha))
            .collect();
        colors.sort();
        colors.dedup();
        colors
    };
    let histogram = build_histogram(&pixels, &locked_colors);

    // Grid-passthrough shortcut (§4.5 step 3): only fires in auto-target
    // mode once the image is already dense enough to fill most of the
    // grid, not merely because unique colors happen to fit under capacity.
    let auto_target = options.reduced_colors.is_none();
    let threshold = passthrough_threshold(capacity, &stats);
    if auto_target && histogram.len() as u32 >= threshold {
        let png_bytes = RgbaImage {
            width: image.width,
            height: image.height,
            pixels: pixels.clone(),
        }
        .encode_rgba()?;
        return Ok(ReducedOutput {
            png_bytes,
            colors_used: histogram.len(),
            detail_bits_rgb,
        });
    }

    let target = resolve_target_color_count(options, &stats, histogram.len());
    let unlocked_target = target.saturating_sub(locked_colors.len()).max(1);

    let unlocked_colors: Vec<(Rgba, u64)> = histogram
        .iter()
        .filter(|e| !e.locked)
        .map(|e| (e.color, e.weight))
        .collect();
    let all_colors: Vec<(Rgba, u64)> = histogram.iter().map(|e| (e.color, e.weight)).collect();

    let mut centroids: Vec<Rgba> = locked_colors.clone();
    centroids.extend(median_cut(&unlocked_colors, unlocked_target));
    let mut locked_mask = vec![true; locked_colors.len()];
    locked_mask.resize(centroids.len(), false);

    kmeans_refine(&all_colors, &mut centroids, 3, &locked_mask);

    let centroids = auto_trim(centroids, locked_colors.len());

    let mut remapped = Vec::with_capacity(pixels.len());
    for &p in &pixels {
        let nearest = nearest_centroid(&centroids, p);
        remapped.push(centroids[nearest].canonicalize());
    }

    let png_bytes = RgbaImage {
        width: image.width,
        height: image.height,
        pixels: remapped,
    }
    .encode_rgba()?;

    Ok(ReducedOutput {
        png_bytes,
        colors_used: centroids.len(),
        detail_bits_rgb,
    })
}

/// §4.5 step 1: reduce `bits_rgb` by one (floor 3) over flat, desaturated,
/// non-vibrant images, and cap `bits_alpha` to the bit width the image's
/// actual alpha-level count needs, never raising either knob.
fn tune_bitdepth(pixels: &[Rgba], options: &PngxOptions, stats: &ImageStats) -> (u8, u8) {
    let mut bits_rgb = options.reduced_bits_rgb;
    if stats.gradient_mean < 0.05 && stats.saturation_mean < 0.05 && stats.vibrant_ratio < 0.01 {
        bits_rgb = bits_rgb.saturating_sub(1).max(3);
    }

    let alpha_level_bits = unique_alpha_level_bits(pixels);
    let bits_alpha = options.reduced_alpha_bits.min(alpha_level_bits);

    (bits_rgb, bits_alpha)
}

/// Bits needed to represent the number of distinct alpha values actually
/// present in the image, floored at 1.
fn unique_alpha_level_bits(pixels: &[Rgba]) -> u8 {
    let levels: HashSet<u8> = pixels.iter().map(|p| p.a).collect();
    let count = levels.len().max(1);
    if count <= 1 {
        1
    } else {
        (usize::BITS - (count - 1).leading_zeros()).max(1) as u8
    }
}

/// Grounded on `pngx_reduced.c`'s grid-passthrough gate: `grid_cap *
/// clamp(0.55 + weighted_stats * 0.35, 0, 0.9)`.
fn passthrough_threshold(capacity: u32, stats: &ImageStats) -> u32 {
    let weighted_stats = weighted_complexity(stats);
    let fraction = (0.55 + weighted_stats * 0.35).clamp(0.0, 0.9);
    (capacity as f32 * fraction).round() as u32
}

fn weighted_complexity(stats: &ImageStats) -> f32 {
    (stats.gradient_mean * 0.5 + stats.saturation_mean * 0.3 + stats.vibrant_ratio * 0.2)
        .clamp(0.0, 1.0)
}

fn build_histogram(pixels: &[Rgba], locked_colors: &[Rgba]) -> Vec<HistogramEntry> {
    let mut counts: HashMap<u32, u64> = HashMap::new();
    for &p in pixels {
        *counts.entry(p.pack()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(packed, weight)| {
            let color = Rgba::unpack(packed);
            let locked = locked_colors.contains(&color);
            HistogramEntry {
                color,
                weight,
                locked,
            }
        })
        .collect()
}

/// Grounded on `pngx_reduced.c`'s `resolve_reduced_rgba32_target`: scales
/// the target palette size between a floor and the unique-color count using
/// image complexity, clamped to the caller's explicit `reduced_colors` when
/// given.
fn resolve_target_color_count(options: &PngxOptions, stats: &ImageStats, unique: usize) -> usize {
    if let Some(explicit) = options.reduced_colors {
        return (explicit as usize).min(unique).max(2);
    }

    let complexity = weighted_complexity(stats);
    let floor = 64usize;
    let ceiling = 4096usize.min(unique);
    let target = floor as f32 + complexity * (ceiling.saturating_sub(floor)) as f32;
    (target.round() as usize).clamp(2, unique.max(2))
}

struct ColorBox {
    colors: Vec<(Rgba, u64)>,
}

impl ColorBox {
    fn weight(&self) -> u64 {
        self.colors.iter().map(|&(_, w)| w).sum()
    }

    fn widest_axis(&self) -> usize {
        let mut min = [255u8; 3];
        let mut max = [0u8; 3];
        for &(c, _) in &self.colors {
            let channels = [c.r, c.g, c.b];
            for i in 0..3 {
                min[i] = min[i].min(channels[i]);
                max[i] = max[i].max(channels[i]);
            }
        }
        let ranges = [
            max[0].saturating_sub(min[0]),
            max[1].saturating_sub(min[1]),
            max[2].saturating_sub(min[2]),
        ];
        if ranges[0] >= ranges[1] && ranges[0] >= ranges[2] {
            0
        } else if ranges[1] >= ranges[2] {
            1
        } else {
            2
        }
    }

    fn centroid(&self) -> Rgba {
        let total = self.weight().max(1) as f64;
        let mut r_sum = 0f64;
        let mut g_sum = 0f64;
        let mut b_sum = 0f64;
        let mut a_sum = 0f64;
        for &(c, w) in &self.colors {
            let w = w as f64;
            r_sum += c.r as f64 * w;
            g_sum += c.g as f64 * w;
            b_sum += c.b as f64 * w;
            a_sum += c.a as f64 * w;
        }
        Rgba::new(
            (r_sum / total).round() as u8,
            (g_sum / total).round() as u8,
            (b_sum / total).round() as u8,
            (a_sum / total).round() as u8,
        )
    }
}

/// Median-cut palette selection: repeatedly splits the box with the
/// greatest total weight on its widest channel axis at a balanced-weight
/// split index, until `target` boxes exist (or no box can split further).
fn median_cut(colors: &[(Rgba, u64)], target: usize) -> Vec<Rgba> {
    if colors.is_empty() {
        return Vec::new();
    }

    let mut boxes = vec![ColorBox {
        colors: colors.to_vec(),
    }];

    while boxes.len() < target {
        let Some((split_idx, _)) = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.colors.len() > 1)
            .max_by_key(|(_, b)| b.weight())
        else {
            break;
        };

        let axis = boxes[split_idx].widest_axis();
        let mut to_split = boxes.swap_remove(split_idx);
        to_split.colors.sort_by_key(|&(c, _)| match axis {
            0 => c.r,
            1 => c.g,
            _ => c.b,
        });

        let total_weight: u64 = to_split.colors.iter().map(|&(_, w)| w).sum();
        let half = total_weight / 2;
        let mut running = 0u64;
        let mut split_at = to_split.colors.len() / 2;
        for (i, &(_, w)) in to_split.colors.iter().enumerate() {
            running += w;
            if running >= half {
                split_at = (i + 1).clamp(1, to_split.colors.len() - 1);
                break;
            }
        }

        let right = to_split.colors.split_off(split_at);
        boxes.push(to_split);
        boxes.push(ColorBox { colors: right });
    }

    boxes.iter().map(ColorBox::centroid).collect()
}

/// K-means refinement over the median-cut seed centroids, bounded to a
/// small fixed number of iterations (§4.5 step 9). Entries marked `locked`
/// in `locked` never have their centroid position updated, so a protected
/// color is never merged away.
fn kmeans_refine(colors: &[(Rgba, u64)], centroids: &mut [Rgba], max_iterations: u32, locked: &[bool]) {
    for _ in 0..max_iterations {
        let mut sums = vec![(0f64, 0f64, 0f64, 0f64, 0u64); centroids.len()];
        for &(color, weight) in colors {
            let nearest = nearest_centroid(centroids, color);
            let entry = &mut sums[nearest];
            let w = weight as f64;
            entry.0 += color.r as f64 * w;
            entry.1 += color.g as f64 * w;
            entry.2 += color.b as f64 * w;
            entry.3 += color.a as f64 * w;
            entry.4 += weight;
        }

        let mut changed = false;
        for (i, centroid) in centroids.iter_mut().enumerate() {
            if locked.get(i).copied().unwrap_or(false) {
                continue;
            }
            let (r, g, b, a, count) = sums[i];
            if count == 0 {
                continue;
            }
            let total = count as f64;
            let updated = Rgba::new(
                (r / total).round() as u8,
                (g / total).round() as u8,
                (b / total).round() as u8,
                (a / total).round() as u8,
            );
            if updated != *centroid {
                changed = true;
            }
            *centroid = updated;
        }

        if !changed {
            break;
        }
    }
}

/// Step 10/11 auto-trim: k-means convergence can leave two unlocked
/// centroids sitting on the same final color; collapse those duplicates so
/// the emitted palette never carries redundant entries. Locked (protected)
/// centroids are always kept.
fn auto_trim(centroids: Vec<Rgba>, locked_count: usize) -> Vec<Rgba> {
    let mut seen = HashSet::new();
    let mut trimmed = Vec::with_capacity(centroids.len());
    for (i, color) in centroids.into_iter().enumerate() {
        if i < locked_count || seen.insert(color) {
            trimmed.push(color);
        }
    }
    trimmed
}

fn nearest_centroid(centroids: &[Rgba], color: Rgba) -> usize {
    centroids
        .iter()
        .enumerate()
        .min_by_key(|&(_, &c)| color_distance_sq(c, color))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
