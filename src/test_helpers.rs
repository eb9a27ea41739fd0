//! Shared test utilities.
//!
//! Synthetic images are generated on the fly so tests never depend on
//! fixture files.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Encode a gradient PNG of the given size.
pub fn encode_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Write a gradient PNG to `path`.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    std::fs::write(path, encode_test_png(width, height)).unwrap();
}

/// Decode `bytes` and return their pixel size.
pub fn decoded_size(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}
