//! Export helpers for the embedding layer.
//!
//! The core's artifact is an in-memory pixel grid; these helpers turn it
//! into the shapes host layers typically want (PNG bytes, a data URI for a
//! webview, a file on disk). Clipboard integration stays with the host.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Encodes the stitched image as PNG bytes.
pub fn to_png_bytes(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| Error::Encoding(e.to_string()))?;
    Ok(bytes)
}

/// Encodes the stitched image as a `data:image/png;base64,…` URI.
pub fn to_base64_data_uri(image: &RgbaImage) -> Result<String> {
    let png = to_png_bytes(image)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

/// Writes the stitched image to `path` as PNG.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    let bytes = to_png_bytes(image)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
