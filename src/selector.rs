//! Size Selector (§4.7), grounded on
//! `original_source/library/src/pngx.c`'s `pngx_quantization_better` and the
//! surrounding "pick the smaller of several candidate encodings" logic in
//! `pngx_run_quantization`.

use crate::error::{PngxError, Result};
use crate::options::LossyType;

/// The lossless-re-optimized quantizer output, paired with its own
/// lossless-re-optimized form so the selector can pick whichever of the two
/// is smaller before applying the §4.7 decision rule.
pub struct QuantizedCandidate {
    pub quantized: Vec<u8>,
    pub lossless_of_quantized: Vec<u8>,
    pub strategy: LossyType,
}

pub struct Selection {
    pub label: &'static str,
    pub bytes: Vec<u8>,
}

/// §4.7 decision rule: an RGBA-lossy strategy (LimitedRGBA4444,
/// ReducedRGBA32) always wins over the lossless-re-optimized original,
/// since choosing one of those strategies is itself an explicit opt-in to
/// lossy RGBA precision — it is not subject to the "must shrink" floor. A
/// Palette256 candidate only wins if it is strictly smaller than the
/// lossless-re-optimized original.
pub fn select(
    lossless_original: Vec<u8>,
    quantized: Option<QuantizedCandidate>,
    input_size: usize,
) -> Result<Selection> {
    if let Some(candidate) = quantized {
        let (bytes, label) = if candidate.quantized.len() <= candidate.lossless_of_quantized.len() {
            (candidate.quantized, "quantized")
        } else {
            (candidate.lossless_of_quantized, "lossless-of-quantized")
        };

        if is_rgba_lossy(candidate.strategy) {
            if bytes.len() > input_size {
                log::warn!(
                    "PNGX: RGBA-lossy candidate ({label}) is {} bytes, larger than the \
                     {input_size}-byte input; keeping it anyway per the RGBA-lossy override",
                    bytes.len()
                );
            }
            return Ok(Selection { label, bytes });
        }

        if bytes.len() < lossless_original.len() && bytes.len() <= input_size {
            return Ok(Selection { label, bytes });
        }
    }

    if lossless_original.len() > input_size {
        return Err(PngxError::OutputNotSmaller);
    }

    Ok(Selection {
        label: "lossless-original",
        bytes: lossless_original,
    })
}

pub fn is_rgba_lossy(strategy: LossyType) -> bool {
    matches!(
        strategy,
        LossyType::LimitedRgba4444 | LossyType::ReducedRgba32
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lossless_wins_when_no_quantized_candidate_exists() {
        let selected = select(vec![0u8; 80], None, 200).unwrap();
        assert_eq!(selected.label, "lossless-original");
        assert_eq!(selected.bytes.len(), 80);
    }

    #[test]
    fn lossless_original_larger_than_input_is_rejected() {
        let err = select(vec![0u8; 500], None, 100).unwrap_err();
        assert_eq!(err, PngxError::OutputNotSmaller);
    }

    #[test]
    fn rgba_lossy_override_bypasses_size_floor() {
        let candidate = QuantizedCandidate {
            quantized: vec![0u8; 500],
            lossless_of_quantized: vec![0u8; 600],
            strategy: LossyType::ReducedRgba32,
        };
        let selected = select(vec![0u8; 50], Some(candidate), 100).unwrap();
        assert_eq!(selected.label, "quantized");
        assert_eq!(selected.bytes.len(), 500);
    }

    #[test]
    fn palette256_candidate_only_wins_if_smaller_than_lossless_original() {
        let candidate = QuantizedCandidate {
            quantized: vec![0u8; 120],
            lossless_of_quantized: vec![0u8; 130],
            strategy: LossyType::Palette256,
        };
        let selected = select(vec![0u8; 100], Some(candidate), 1000).unwrap();
        assert_eq!(selected.label, "lossless-original");
        assert_eq!(selected.bytes.len(), 100);
    }

    #[test]
    fn palette256_candidate_smaller_than_lossless_but_still_over_input_is_rejected() {
        let candidate = QuantizedCandidate {
            quantized: vec![0u8; 200],
            lossless_of_quantized: vec![0u8; 250],
            strategy: LossyType::Palette256,
        };
        let err = select(vec![0u8; 300], Some(candidate), 50).unwrap_err();
        assert_eq!(err, PngxError::OutputNotSmaller);
    }

    #[test]
    fn palette256_candidate_wins_when_strictly_smaller() {
        let candidate = QuantizedCandidate {
            quantized: vec![0u8; 60],
            lossless_of_quantized: vec![0u8; 70],
            strategy: LossyType::Palette256,
        };
        let selected = select(vec![0u8; 100], Some(candidate), 1000).unwrap();
        assert_eq!(selected.label, "quantized");
        assert_eq!(selected.bytes.len(), 60);
    }
}
