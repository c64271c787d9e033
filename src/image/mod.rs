//! Image format conversion
//!
//! Normalizes whatever image format the model returns into PNG before it is
//! handed back to the browser.

use crate::{Error, Result};
use image::ImageFormat;
use std::io::Cursor;

fn reencode_png_sync(bytes: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Decodes `bytes` and re-encodes them as PNG on the blocking pool.
pub async fn reencode_png(bytes: Vec<u8>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || reencode_png_sync(&bytes))
        .await
        .map_err(|e| Error::Invariant(format!("Image processing task join error: {}", e)))?
}
