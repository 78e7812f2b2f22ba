//! AVIF encoding (§6 "External collaborators"). Thin wrapper over the
//! `image` crate's native AVIF encoder, grounded on
//! `other_examples/FerrahWolfeh-avif-converter`'s use of `image`'s
//! `avif-native` feature.

use image::codecs::avif::AvifEncoder;
use image::{ColorType, ImageEncoder};

use crate::error::{PngxError, Result};
use crate::image::RgbaImage;

/// Mirrors `colopresso.h`'s `avif_options_t`: quality in `[0, 100]`, speed
/// in `[0, 10]` (0 = slowest/best).
#[derive(Debug, Clone, Copy)]
pub struct AvifOptions {
    pub quality: u8,
    pub speed: u8,
}

impl Default for AvifOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            speed: 6,
        }
    }
}

pub fn encode(image: &RgbaImage, options: &AvifOptions) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(image.pixel_count() * 4);
    for p in &image.pixels {
        raw.extend_from_slice(&[p.r, p.g, p.b, p.a]);
    }

    let mut bytes = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(&mut bytes, options.speed, options.quality);
    encoder
        .write_image(&raw, image.width, image.height, ColorType::Rgba8.into())
        .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
    Ok(bytes)
}
