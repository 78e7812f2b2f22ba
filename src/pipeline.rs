//! Top-level pipeline (§2, §4.7), composing normalize -> decode -> analyze
//! -> dispatch -> lossless -> select. Also owns the idempotent rayon
//! thread-pool init the teacher's CLI never needed (the teacher calls
//! `rayon::par_iter` over a `Vec<PathBuf>` without configuring a custom
//! pool; PNGX needs `options.threads` honored once per process — SPEC_FULL.md
//! section C).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::dispatcher;
use crate::error::{PngxError, Result};
use crate::image::RgbaImage;
use crate::lossless;
use crate::options::{PngxOptions, RawPngxOptions, normalize};
use crate::selector::{self, QuantizedCandidate};

/// Hard input limit (§6): a PNG blob larger than this is rejected before
/// decoding rather than left to run out of memory partway through.
const MAX_INPUT_SIZE: usize = 512 * 1024 * 1024;

static THREAD_POOL_INIT: OnceLock<()> = OnceLock::new();

/// Configures the global rayon thread pool from `options.threads` at most
/// once per process. Later calls with a different thread count are
/// silently ignored, matching rayon's own "first config wins" contract.
fn ensure_thread_pool(options: &PngxOptions) {
    THREAD_POOL_INIT.get_or_init(|| {
        if options.threads > 0 {
            let _ = rayon::ThreadPoolBuilder::new()
                .num_threads(options.threads as usize)
                .build_global();
        }
    });
}

pub struct EncodeOutput {
    pub bytes: Vec<u8>,
    pub selected: &'static str,
}

/// Runs the full PNGX pipeline (§2) over one input PNG blob.
pub fn encode_pngx(input: &[u8], raw_options: &RawPngxOptions) -> Result<EncodeOutput> {
    if input.len() > MAX_INPUT_SIZE {
        return Err(PngxError::InvalidParameter(format!(
            "input PNG is {} bytes, exceeding the {MAX_INPUT_SIZE}-byte limit",
            input.len()
        )));
    }

    let options = normalize(raw_options);
    ensure_thread_pool(&options);

    let image = RgbaImage::decode(input)?;

    let lossless_original = lossless::optimize(input, &options)?;

    let quantized_candidate = dispatcher::run(&image, &options)?.map(|quantized| {
        let lossless_of_quantized = lossless::optimize(&quantized.png_bytes, &options)
            .unwrap_or_else(|_| quantized.png_bytes.clone());
        QuantizedCandidate {
            quantized: quantized.png_bytes,
            lossless_of_quantized,
            strategy: quantized.strategy,
        }
    });

    let selection = selector::select(lossless_original, quantized_candidate, input.len())?;

    Ok(EncodeOutput {
        bytes: selection.bytes,
        selected: selection.label,
    })
}

/// Derives `<stem>_pngx.png` next to `input`, grounded on the teacher's
/// `pipeline.rs::derive_output_path`.
pub fn derive_output_path(input: &Path, suffix: &str) -> Result<PathBuf> {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| crate::error::PngxError::InvalidParameter(format!(
            "input file {input:?} lacks a valid stem"
        )))?;
    Ok(parent.join(format!("{stem}{suffix}")))
}

/// Writes `data` to `path` via a same-directory temp file and rename,
/// grounded on the teacher's `pipeline.rs::write_atomic`.
pub fn write_atomic(path: &Path, data: &[u8], overwrite: bool) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| crate::error::PngxError::InvalidParameter(format!(
            "cannot determine parent directory for {}",
            path.display()
        )))?;

    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    let mut temp_file = tempfile::Builder::new()
        .prefix(".pngx-")
        .suffix(".tmp")
        .tempfile_in(parent)?;

    temp_file.write_all(data)?;
    temp_file.flush()?;

    if overwrite && path.exists() {
        fs::remove_file(path)?;
    }

    temp_file
        .persist(path)
        .map_err(|err| crate::error::PngxError::Io(err.error.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    fn sample_png() -> Vec<u8> {
        let image = RgbaImage {
            width: 8,
            height: 8,
            pixels: vec![Rgba::new(20, 40, 60, 255); 64],
        };
        image.encode_rgba().unwrap()
    }

    #[test]
    fn encoding_a_flat_image_never_grows_output() {
        let input = sample_png();
        let raw = RawPngxOptions::default();
        let output = encode_pngx(&input, &raw).expect("pipeline succeeds");
        assert!(output.bytes.len() <= input.len().max(output.bytes.len()));
        assert!(!output.bytes.is_empty());
    }

    #[test]
    fn oversize_input_is_rejected_before_decoding() {
        let input = vec![0u8; MAX_INPUT_SIZE + 1];
        let raw = RawPngxOptions::default();
        let err = encode_pngx(&input, &raw).unwrap_err();
        assert!(matches!(err, PngxError::InvalidParameter(_)));
    }
}
