//! PNGX: an adaptive lossy/lossless PNG optimizer.
//!
//! Selects between three RGBA-precision quantization strategies
//! (Palette256, LimitedRGBA4444, ReducedRGBA32), always re-optimizes
//! losslessly, and keeps whichever candidate is smallest without ever
//! growing the input (§2, §4.7).

pub mod analyzer;
pub mod avif;
pub mod color;
pub mod dispatcher;
pub mod dither;
pub mod error;
pub mod image;
pub mod limited4444;
pub mod log;
pub mod lossless;
pub mod options;
pub mod palette256;
pub mod pipeline;
pub mod reduced;
pub mod selector;
pub mod snap;
pub mod version;
pub mod webp;

pub use color::Rgba;
pub use error::{PngxError, Result};
pub use image::RgbaImage;
pub use options::{LossyType, PngxOptions, RawPngxOptions, normalize};
pub use pipeline::{EncodeOutput, encode_pngx};
