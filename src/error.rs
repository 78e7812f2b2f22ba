use std::fmt;

/// Structured result codes for the PNGX pipeline.
///
/// Mirrors the `cpres_error_t` surface from the original library (§6/§7 of
/// `SPEC_FULL.md`) but carries a `Result`-shaped payload instead of a
/// process-wide "last error" accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PngxError {
    FileNotFound(String),
    InvalidPng(String),
    InvalidFormat(String),
    OutOfMemory,
    EncodeFailed(String),
    DecodeFailed(String),
    Io(String),
    InvalidParameter(String),
    /// Not a "real" failure: the size-selector's not-smaller-than-input
    /// contract rejected the candidate (§4.7, §7).
    OutputNotSmaller,
}

impl fmt::Display for PngxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PngxError::FileNotFound(path) => write!(f, "file not found: {path}"),
            PngxError::InvalidPng(msg) => write!(f, "invalid PNG: {msg}"),
            PngxError::InvalidFormat(msg) => write!(f, "invalid format: {msg}"),
            PngxError::OutOfMemory => write!(f, "out of memory"),
            PngxError::EncodeFailed(msg) => write!(f, "encode failed: {msg}"),
            PngxError::DecodeFailed(msg) => write!(f, "decode failed: {msg}"),
            PngxError::Io(msg) => write!(f, "I/O error: {msg}"),
            PngxError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            PngxError::OutputNotSmaller => {
                write!(f, "output not smaller than input")
            }
        }
    }
}

impl std::error::Error for PngxError {}

impl From<std::io::Error> for PngxError {
    fn from(err: std::io::Error) -> Self {
        PngxError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PngxError>;
