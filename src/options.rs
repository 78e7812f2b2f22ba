//! Option Normalizer (§4.1), grounded on
//! `original_source/library/src/pngx.c`'s `pngx_fill_pngx_options` and the
//! `COLOPRESSO_PNGX_DEFAULT_*` constants in `colopresso.h`.

use crate::color::Rgba;

/// Closed 3-variant strategy sum type (§9 "Tagged strategy variants"):
/// modeled as an enum instead of an integer so the dispatcher's match is
/// exhaustive and the ReducedRGBA32 parameter cluster is only carried when
/// active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossyType {
    Palette256,
    LimitedRgba4444,
    ReducedRgba32,
}

impl Default for LossyType {
    fn default() -> Self {
        LossyType::Palette256
    }
}

/// Raw, possibly out-of-range option record as supplied by a caller (§3
/// "Options record"). `None` fields mean "use internal default"; sentinels
/// matching the original's `-1` are modeled with `Option` instead.
#[derive(Debug, Clone)]
pub struct RawPngxOptions {
    pub optimization_level: i32,
    pub strip_safe: bool,
    pub optimize_alpha: bool,
    pub lossy_enable: bool,
    pub lossy_type: LossyType,
    pub max_colors: i32,
    /// `None` = auto.
    pub reduced_colors: Option<i32>,
    pub reduced_bits_rgb: i32,
    pub reduced_alpha_bits: i32,
    pub quality_min: i32,
    pub quality_max: i32,
    pub speed: i32,
    /// `None` = auto.
    pub dither_level: Option<f32>,
    pub saliency_map_enable: bool,
    pub chroma_anchor_enable: bool,
    pub adaptive_dither_enable: bool,
    pub gradient_boost_enable: bool,
    pub chroma_weight_enable: bool,
    pub postprocess_smooth_enable: bool,
    pub postprocess_smooth_importance_cutoff: Option<f32>,
    pub palette256_gradient_profile_enable: bool,
    pub palette256_gradient_profile_dither_floor: Option<f32>,
    pub palette256_alpha_bleed_enable: bool,
    pub palette256_alpha_bleed_max_distance: i32,
    pub palette256_alpha_bleed_opaque_threshold: i32,
    pub palette256_alpha_bleed_soft_limit: i32,
    pub palette256_profile_opaque_ratio_threshold: Option<f32>,
    pub palette256_profile_gradient_mean_max: Option<f32>,
    pub palette256_profile_saturation_mean_max: Option<f32>,
    pub palette256_tune_opaque_ratio_threshold: Option<f32>,
    pub palette256_tune_gradient_mean_max: Option<f32>,
    pub palette256_tune_saturation_mean_max: Option<f32>,
    pub palette256_tune_speed_max: Option<i32>,
    pub palette256_tune_quality_min_floor: Option<i32>,
    pub palette256_tune_quality_max_target: Option<i32>,
    pub protected_colors: Vec<Rgba>,
    pub threads: i32,
}

impl Default for RawPngxOptions {
    fn default() -> Self {
        Self {
            optimization_level: 5,
            strip_safe: true,
            optimize_alpha: true,
            lossy_enable: true,
            lossy_type: LossyType::Palette256,
            max_colors: 256,
            reduced_colors: None,
            reduced_bits_rgb: 4,
            reduced_alpha_bits: 4,
            quality_min: 80,
            quality_max: 95,
            speed: 3,
            dither_level: Some(0.6),
            saliency_map_enable: true,
            chroma_anchor_enable: true,
            adaptive_dither_enable: true,
            gradient_boost_enable: true,
            chroma_weight_enable: true,
            postprocess_smooth_enable: true,
            postprocess_smooth_importance_cutoff: Some(0.6),
            palette256_gradient_profile_enable: true,
            palette256_gradient_profile_dither_floor: Some(0.78),
            palette256_alpha_bleed_enable: true,
            palette256_alpha_bleed_max_distance: 64,
            palette256_alpha_bleed_opaque_threshold: 248,
            palette256_alpha_bleed_soft_limit: 160,
            palette256_profile_opaque_ratio_threshold: Some(0.90),
            palette256_profile_gradient_mean_max: Some(0.16),
            palette256_profile_saturation_mean_max: Some(0.42),
            palette256_tune_opaque_ratio_threshold: Some(0.90),
            palette256_tune_gradient_mean_max: Some(0.14),
            palette256_tune_saturation_mean_max: Some(0.35),
            palette256_tune_speed_max: Some(2),
            palette256_tune_quality_min_floor: Some(85),
            palette256_tune_quality_max_target: Some(95),
            protected_colors: Vec::new(),
            threads: 0,
        }
    }
}

/// Normalized option record: every range enforced (§4.1 "Contract").
#[derive(Debug, Clone)]
pub struct PngxOptions {
    pub optimization_level: u8,
    pub strip_safe: bool,
    pub optimize_alpha: bool,
    pub lossy_enable: bool,
    pub lossy_type: LossyType,
    pub max_colors: u32,
    pub reduced_colors: Option<u32>,
    pub reduced_bits_rgb: u8,
    pub reduced_alpha_bits: u8,
    pub quality_min: u8,
    pub quality_max: u8,
    pub speed: u8,
    pub dither_level: Option<f32>,
    pub saliency_map_enable: bool,
    pub chroma_anchor_enable: bool,
    pub adaptive_dither_enable: bool,
    pub gradient_boost_enable: bool,
    pub chroma_weight_enable: bool,
    pub postprocess_smooth_enable: bool,
    pub postprocess_smooth_importance_cutoff: Option<f32>,
    pub palette256_gradient_profile_enable: bool,
    pub palette256_gradient_profile_dither_floor: Option<f32>,
    pub palette256_alpha_bleed_enable: bool,
    pub palette256_alpha_bleed_max_distance: u16,
    pub palette256_alpha_bleed_opaque_threshold: u8,
    pub palette256_alpha_bleed_soft_limit: u8,
    pub palette256_profile_opaque_ratio_threshold: f32,
    pub palette256_profile_gradient_mean_max: f32,
    pub palette256_profile_saturation_mean_max: f32,
    pub palette256_tune_opaque_ratio_threshold: f32,
    pub palette256_tune_gradient_mean_max: f32,
    pub palette256_tune_saturation_mean_max: f32,
    pub palette256_tune_speed_max: i32,
    pub palette256_tune_quality_min_floor: i32,
    pub palette256_tune_quality_max_target: i32,
    pub protected_colors: Vec<Rgba>,
    pub threads: u32,
}

fn clamp_i32(v: i32, lo: i32, hi: i32) -> i32 {
    v.clamp(lo, hi)
}

fn clamp_f32(v: f32, lo: f32, hi: f32) -> f32 {
    v.clamp(lo, hi)
}

/// Option Normalizer entry point (§4.1). Clamps every integer range, swaps
/// `quality_min`/`quality_max` if inverted, maps negative dither/threshold
/// sentinels to "auto", and coerces an inconsistent protected-color list to
/// "none".
pub fn normalize(raw: &RawPngxOptions) -> PngxOptions {
    let mut quality_min = clamp_i32(raw.quality_min, 0, 100) as u8;
    let mut quality_max = clamp_i32(raw.quality_max, 0, 100) as u8;
    if quality_min > quality_max {
        std::mem::swap(&mut quality_min, &mut quality_max);
    }

    let dither_level = match raw.dither_level {
        Some(v) if v >= 0.0 => Some(clamp_f32(v, 0.0, 1.0)),
        _ => None,
    };

    let clamp_auto_unit = |v: Option<f32>| -> Option<f32> {
        v.filter(|value| *value >= 0.0)
            .map(|value| clamp_f32(value, 0.0, 1.0))
    };

    PngxOptions {
        optimization_level: clamp_i32(raw.optimization_level, 0, 6) as u8,
        strip_safe: raw.strip_safe,
        optimize_alpha: raw.optimize_alpha,
        lossy_enable: raw.lossy_enable,
        lossy_type: raw.lossy_type,
        max_colors: clamp_i32(raw.max_colors, 2, 256) as u32,
        reduced_colors: raw
            .reduced_colors
            .map(|v| clamp_i32(v, 2, 32768) as u32),
        reduced_bits_rgb: clamp_i32(raw.reduced_bits_rgb, 1, 8) as u8,
        reduced_alpha_bits: clamp_i32(raw.reduced_alpha_bits, 1, 8) as u8,
        quality_min,
        quality_max,
        speed: clamp_i32(raw.speed, 1, 10) as u8,
        dither_level,
        saliency_map_enable: raw.saliency_map_enable,
        chroma_anchor_enable: raw.chroma_anchor_enable,
        adaptive_dither_enable: raw.adaptive_dither_enable,
        gradient_boost_enable: raw.gradient_boost_enable,
        chroma_weight_enable: raw.chroma_weight_enable,
        postprocess_smooth_enable: raw.postprocess_smooth_enable,
        postprocess_smooth_importance_cutoff: clamp_auto_unit(
            raw.postprocess_smooth_importance_cutoff,
        ),
        palette256_gradient_profile_enable: raw.palette256_gradient_profile_enable,
        palette256_gradient_profile_dither_floor: clamp_auto_unit(
            raw.palette256_gradient_profile_dither_floor,
        ),
        palette256_alpha_bleed_enable: raw.palette256_alpha_bleed_enable,
        palette256_alpha_bleed_max_distance: clamp_i32(
            raw.palette256_alpha_bleed_max_distance,
            0,
            65535,
        ) as u16,
        palette256_alpha_bleed_opaque_threshold: clamp_i32(
            raw.palette256_alpha_bleed_opaque_threshold,
            0,
            255,
        ) as u8,
        palette256_alpha_bleed_soft_limit: clamp_i32(
            raw.palette256_alpha_bleed_soft_limit,
            0,
            255,
        ) as u8,
        palette256_profile_opaque_ratio_threshold: clamp_auto_unit(
            raw.palette256_profile_opaque_ratio_threshold,
        )
        .unwrap_or(0.90),
        palette256_profile_gradient_mean_max: clamp_auto_unit(
            raw.palette256_profile_gradient_mean_max,
        )
        .unwrap_or(0.16),
        palette256_profile_saturation_mean_max: clamp_auto_unit(
            raw.palette256_profile_saturation_mean_max,
        )
        .unwrap_or(0.42),
        palette256_tune_opaque_ratio_threshold: clamp_auto_unit(
            raw.palette256_tune_opaque_ratio_threshold,
        )
        .unwrap_or(0.90),
        palette256_tune_gradient_mean_max: clamp_auto_unit(
            raw.palette256_tune_gradient_mean_max,
        )
        .unwrap_or(0.14),
        palette256_tune_saturation_mean_max: clamp_auto_unit(
            raw.palette256_tune_saturation_mean_max,
        )
        .unwrap_or(0.35),
        palette256_tune_speed_max: raw
            .palette256_tune_speed_max
            .map(|v| clamp_i32(v, 1, 10))
            .unwrap_or(-1),
        palette256_tune_quality_min_floor: raw
            .palette256_tune_quality_min_floor
            .map(|v| clamp_i32(v, 0, 100))
            .unwrap_or(-1),
        palette256_tune_quality_max_target: raw
            .palette256_tune_quality_max_target
            .map(|v| clamp_i32(v, 0, 100))
            .unwrap_or(-1),
        protected_colors: if raw.protected_colors.is_empty() {
            Vec::new()
        } else {
            raw.protected_colors.clone()
        },
        threads: raw.threads.max(0) as u32,
    }
}

impl From<&PngxOptions> for RawPngxOptions {
    fn from(opts: &PngxOptions) -> Self {
        Self {
            optimization_level: opts.optimization_level as i32,
            strip_safe: opts.strip_safe,
            optimize_alpha: opts.optimize_alpha,
            lossy_enable: opts.lossy_enable,
            lossy_type: opts.lossy_type,
            max_colors: opts.max_colors as i32,
            reduced_colors: opts.reduced_colors.map(|v| v as i32),
            reduced_bits_rgb: opts.reduced_bits_rgb as i32,
            reduced_alpha_bits: opts.reduced_alpha_bits as i32,
            quality_min: opts.quality_min as i32,
            quality_max: opts.quality_max as i32,
            speed: opts.speed as i32,
            dither_level: Some(opts.dither_level.unwrap_or(-1.0)),
            saliency_map_enable: opts.saliency_map_enable,
            chroma_anchor_enable: opts.chroma_anchor_enable,
            adaptive_dither_enable: opts.adaptive_dither_enable,
            gradient_boost_enable: opts.gradient_boost_enable,
            chroma_weight_enable: opts.chroma_weight_enable,
            postprocess_smooth_enable: opts.postprocess_smooth_enable,
            postprocess_smooth_importance_cutoff: Some(
                opts.postprocess_smooth_importance_cutoff.unwrap_or(-1.0),
            ),
            palette256_gradient_profile_enable: opts.palette256_gradient_profile_enable,
            palette256_gradient_profile_dither_floor: Some(
                opts.palette256_gradient_profile_dither_floor.unwrap_or(-1.0),
            ),
            palette256_alpha_bleed_enable: opts.palette256_alpha_bleed_enable,
            palette256_alpha_bleed_max_distance: opts.palette256_alpha_bleed_max_distance as i32,
            palette256_alpha_bleed_opaque_threshold: opts.palette256_alpha_bleed_opaque_threshold
                as i32,
            palette256_alpha_bleed_soft_limit: opts.palette256_alpha_bleed_soft_limit as i32,
            palette256_profile_opaque_ratio_threshold: Some(
                opts.palette256_profile_opaque_ratio_threshold,
            ),
            palette256_profile_gradient_mean_max: Some(opts.palette256_profile_gradient_mean_max),
            palette256_profile_saturation_mean_max: Some(
                opts.palette256_profile_saturation_mean_max,
            ),
            palette256_tune_opaque_ratio_threshold: Some(
                opts.palette256_tune_opaque_ratio_threshold,
            ),
            palette256_tune_gradient_mean_max: Some(opts.palette256_tune_gradient_mean_max),
            palette256_tune_saturation_mean_max: Some(opts.palette256_tune_saturation_mean_max),
            palette256_tune_speed_max: if opts.palette256_tune_speed_max < 0 {
                None
            } else {
                Some(opts.palette256_tune_speed_max)
            },
            palette256_tune_quality_min_floor: if opts.palette256_tune_quality_min_floor < 0 {
                None
            } else {
                Some(opts.palette256_tune_quality_min_floor)
            },
            palette256_tune_quality_max_target: if opts.palette256_tune_quality_max_target < 0 {
                None
            } else {
                Some(opts.palette256_tune_quality_max_target)
            },
            protected_colors: opts.protected_colors.clone(),
            threads: opts.threads as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let normalized = normalize(&RawPngxOptions::default());
        assert_eq!(normalized.optimization_level, 5);
        assert_eq!(normalized.max_colors, 256);
        assert_eq!(normalized.quality_min, 80);
        assert_eq!(normalized.quality_max, 95);
        assert_eq!(normalized.speed, 3);
        assert_eq!(normalized.dither_level, Some(0.6));
        assert_eq!(normalized.reduced_bits_rgb, 4);
        assert_eq!(normalized.reduced_alpha_bits, 4);
    }

    #[test]
    fn inverted_quality_bounds_are_swapped() {
        let mut raw = RawPngxOptions::default();
        raw.quality_min = 95;
        raw.quality_max = 80;
        let normalized = normalize(&raw);
        assert_eq!(normalized.quality_min, 80);
        assert_eq!(normalized.quality_max, 95);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut raw = RawPngxOptions::default();
        raw.optimization_level = 99;
        raw.max_colors = 4000;
        raw.speed = -3;
        let normalized = normalize(&raw);
        assert_eq!(normalized.optimization_level, 6);
        assert_eq!(normalized.max_colors, 256);
        assert_eq!(normalized.speed, 1);
    }

    #[test]
    fn normalizing_a_normalized_record_is_idempotent() {
        let normalized = normalize(&RawPngxOptions::default());
        let roundtrip_raw = RawPngxOptions::from(&normalized);
        let renormalized = normalize(&roundtrip_raw);
        assert_eq!(normalized.optimization_level, renormalized.optimization_level);
        assert_eq!(normalized.max_colors, renormalized.max_colors);
        assert_eq!(normalized.quality_min, renormalized.quality_min);
        assert_eq!(normalized.quality_max, renormalized.quality_max);
        assert_eq!(normalized.speed, renormalized.speed);
        assert_eq!(normalized.dither_level, renormalized.dither_level);
        assert_eq!(
            normalized.palette256_tune_speed_max,
            renormalized.palette256_tune_speed_max
        );
    }

    #[test]
    fn negative_dither_means_auto() {
        let mut raw = RawPngxOptions::default();
        raw.dither_level = Some(-1.0);
        let normalized = normalize(&raw);
        assert_eq!(normalized.dither_level, None);
    }
}
