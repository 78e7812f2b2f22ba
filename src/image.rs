use std::io::Cursor;

use png::{AdaptiveFilterType, BitDepth, ColorType, Compression, Encoder, FilterType};

use crate::color::Rgba;
use crate::error::{PngxError, Result};

/// Canonical 8-bit RGBA pixel buffer (§3 "Pixel buffer").
///
/// Row-major, `(x, y)` maps to `y * width + x`. Owned for the full pipeline,
/// grounded on `original_source/library/src/pngx_common.c`'s
/// `pngx_rgba_image_t` / `load_rgba_image`.
#[derive(Debug, Clone)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgba>,
}

impl RgbaImage {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Rgba {
        self.pixels[(y as usize * self.width as usize) + x as usize]
    }

    /// Decodes a PNG byte blob into a canonical RGBA image (the "decoder
    /// edge" of §2, out of core scope but needed as the pipeline's entry
    /// point).
    pub fn decode(data: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(data);
        let mut decoder = png::Decoder::new(cursor);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|e| PngxError::InvalidPng(e.to_string()))?;
        let mut buffer = vec![0u8; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buffer)
            .map_err(|e| PngxError::DecodeFailed(e.to_string()))?;

        if info.bit_depth != BitDepth::Eight {
            return Err(PngxError::InvalidFormat(
                "expected 8-bit output after decoding".into(),
            ));
        }

        let pixel_count = info.width as usize * info.height as usize;
        let mut pixels = Vec::with_capacity(pixel_count);
        match info.color_type {
            ColorType::Rgba => {
                for chunk in buffer[..pixel_count * 4].chunks_exact(4) {
                    pixels.push(Rgba::new(chunk[0], chunk[1], chunk[2], chunk[3]));
                }
            }
            ColorType::Rgb => {
                for chunk in buffer[..pixel_count * 3].chunks_exact(3) {
                    pixels.push(Rgba::new(chunk[0], chunk[1], chunk[2], 255));
                }
            }
            ColorType::Grayscale => {
                for &v in &buffer[..pixel_count] {
                    pixels.push(Rgba::new(v, v, v, 255));
                }
            }
            ColorType::GrayscaleAlpha => {
                for chunk in buffer[..pixel_count * 2].chunks_exact(2) {
                    pixels.push(Rgba::new(chunk[0], chunk[0], chunk[0], chunk[1]));
                }
            }
            other => {
                return Err(PngxError::InvalidFormat(format!(
                    "unsupported color type after decoding: {other:?}"
                )));
            }
        }

        Ok(Self {
            width: info.width,
            height: info.height,
            pixels,
        })
    }

    /// Encodes this buffer as an 8-bit RGBA PNG, grounded on
    /// `pngx_palette256.c::create_rgba_png` / the teacher's RGBA encode path.
    pub fn encode_rgba(&self) -> Result<Vec<u8>> {
        let mut raw = Vec::with_capacity(self.pixel_count() * 4);
        for p in &self.pixels {
            raw.extend_from_slice(&[p.r, p.g, p.b, p.a]);
        }

        let mut output = Vec::new();
        {
            let mut encoder = Encoder::new(&mut output, self.width, self.height);
            encoder.set_color(ColorType::Rgba);
            encoder.set_depth(BitDepth::Eight);
            encoder.set_compression(Compression::Best);
            encoder.set_filter(FilterType::Paeth);
            encoder.set_adaptive_filter(AdaptiveFilterType::Adaptive);
            let mut writer = encoder
                .write_header()
                .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
            writer
                .write_image_data(&raw)
                .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
            writer
                .finish()
                .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
        }
        Ok(output)
    }
}

/// Encodes an 8-bit indexed PNG with PLTE and a tRNS prefix covering all
/// non-opaque palette entries (§4.4 step 12, §3 "Palette").
///
/// `palette` must be ordered so non-opaque entries precede fully-opaque
/// ones, matching the tRNS-prefix encoding rule in §3.
pub fn encode_indexed_png(
    width: u32,
    height: u32,
    indices: &[u8],
    palette: &[Rgba],
) -> Result<Vec<u8>> {
    if palette.is_empty() || palette.len() > 256 {
        return Err(PngxError::InvalidParameter(
            "palette must hold 1..=256 colors".into(),
        ));
    }
    if indices.len() != width as usize * height as usize {
        return Err(PngxError::InvalidParameter(
            "index buffer length mismatch".into(),
        ));
    }

    let mut palette_bytes = Vec::with_capacity(palette.len() * 3);
    let mut alpha_bytes = Vec::with_capacity(palette.len());
    for color in palette {
        palette_bytes.extend([color.r, color.g, color.b]);
        alpha_bytes.push(color.a);
    }
    while matches!(alpha_bytes.last(), Some(&255)) {
        alpha_bytes.pop();
    }

    let mut output = Vec::new();
    {
        let mut encoder = Encoder::new(&mut output, width, height);
        encoder.set_color(ColorType::Indexed);
        encoder.set_depth(BitDepth::Eight);
        encoder.set_palette(palette_bytes);
        if !alpha_bytes.is_empty() {
            encoder.set_trns(alpha_bytes);
        }
        encoder.set_compression(Compression::Best);
        encoder.set_filter(FilterType::Paeth);
        encoder.set_adaptive_filter(AdaptiveFilterType::Adaptive);

        let mut writer = encoder
            .write_header()
            .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
        writer
            .write_image_data(indices)
            .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| PngxError::EncodeFailed(e.to_string()))?;
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_png(width: u32, height: u32, pixel: Rgba) -> Vec<u8> {
        let image = RgbaImage {
            width,
            height,
            pixels: vec![pixel; (width * height) as usize],
        };
        image.encode_rgba().unwrap()
    }

    #[test]
    fn decode_roundtrips_dimensions_and_pixels() {
        let bytes = make_png(3, 2, Rgba::new(10, 20, 30, 255));
        let decoded = RgbaImage::decode(&bytes).unwrap();
        assert_eq!(decoded.width, 3);
        assert_eq!(decoded.height, 2);
        assert_eq!(decoded.pixels.len(), 6);
        assert_eq!(decoded.pixels[0], Rgba::new(10, 20, 30, 255));
    }

    #[test]
    fn indexed_encode_rejects_oversize_palette() {
        let palette = vec![Rgba::new(0, 0, 0, 255); 257];
        let err = encode_indexed_png(1, 1, &[0], &palette).unwrap_err();
        assert!(matches!(err, PngxError::InvalidParameter(_)));
    }
}
