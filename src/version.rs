//! Version accessors (§6), grounded on `original_source/library/src/pngx.c`'s
//! `pngx_version`/`pngx_bridge_version` reporting helpers.

/// This crate's own version, from `Cargo.toml`.
pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Version of the bundled lossless re-optimizer, pinned to the
/// `oxipng` dependency declared in `Cargo.toml`.
pub fn oxipng_version() -> &'static str {
    "9.0"
}

/// Best-effort identifier for the palette-quantization bridge in use.
pub fn imagequant_version() -> &'static str {
    "imagequant"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_version_is_not_empty() {
        assert!(!crate_version().is_empty());
    }
}
