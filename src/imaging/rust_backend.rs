//! Pure Rust codec on top of the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` |
//! | Resize | `DynamicImage::resize_exact` with the configured filter |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |
//! | Encode → PNG, WebP, TIFF | `DynamicImage::write_to` |

use super::backend::{CodecError, Dimensions, ImageCodec};
use super::params::{EncodeParams, OutputFormat, ResizeFilter};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
///
/// AVIF is excluded: the `image` crate's `"avif"` feature only enables the
/// encoder, so AVIF is an output format here, never an input.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` looks like an image this codec can decode.
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Codec backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCodec {
    filter: ResizeFilter,
}

impl RustCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: ResizeFilter) -> Self {
        Self { filter }
    }
}

impl ImageCodec for RustCodec {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, CodecError> {
        image::load_from_memory(data).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn resize(
        &self,
        image: DynamicImage,
        target: Dimensions,
    ) -> Result<DynamicImage, CodecError> {
        if Dimensions::of(&image) == target {
            return Ok(image);
        }
        Ok(image.resize_exact(target.width, target.height, self.filter.into()))
    }

    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        let quality = params.quality.value() as u8;
        let encoded = match params.format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
            }
            OutputFormat::Avif => {
                image.write_with_encoder(AvifEncoder::new_with_speed_quality(&mut buf, 6, quality))
            }
            other => image.write_to(&mut Cursor::new(&mut buf), other.image_format()),
        };
        encoded.map_err(|e| CodecError::Encode {
            format: params.format,
            message: e.to_string(),
        })?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::test_helpers::encode_test_png;

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
        assert!(!exts.contains(&"avif"));
    }

    #[test]
    fn supported_input_is_case_insensitive() {
        assert!(is_supported_input(Path::new("a/B.PNG")));
        assert!(is_supported_input(Path::new("photo.jpeg")));
        assert!(!is_supported_input(Path::new("notes.txt")));
        assert!(!is_supported_input(Path::new("noext")));
    }

    #[test]
    fn decode_png_dimensions() {
        let codec = RustCodec::new();
        let image = codec.decode(&encode_test_png(160, 90)).unwrap();
        assert_eq!(Dimensions::of(&image), Dimensions::new(160, 90));
    }

    #[test]
    fn decode_garbage_errors() {
        let codec = RustCodec::new();
        assert!(matches!(
            codec.decode(b"definitely not an image"),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn resize_to_exact_target() {
        let codec = RustCodec::with_filter(ResizeFilter::Triangle);
        let image = codec.decode(&encode_test_png(160, 90)).unwrap();
        let resized = codec.resize(image, Dimensions::new(89, 50)).unwrap();
        assert_eq!(Dimensions::of(&resized), Dimensions::new(89, 50));
    }

    #[test]
    fn resize_same_size_is_identity() {
        let codec = RustCodec::new();
        let image = codec.decode(&encode_test_png(16, 9)).unwrap();
        let before = image.clone();
        let after = codec.resize(image, Dimensions::new(16, 9)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn encode_each_format_roundtrips_dimensions() {
        let codec = RustCodec::new();
        let image = codec.decode(&encode_test_png(32, 18)).unwrap();
        for format in [OutputFormat::Png, OutputFormat::Jpeg, OutputFormat::Tiff] {
            let bytes = codec
                .encode(
                    &image,
                    &EncodeParams {
                        format,
                        quality: Quality::new(80),
                    },
                )
                .unwrap();
            assert_eq!(codec.detect_format(&bytes), Some(format));
            let decoded = codec.decode(&bytes).unwrap();
            assert_eq!(Dimensions::of(&decoded), Dimensions::new(32, 18));
        }
    }

    #[test]
    fn encode_avif_produces_bytes() {
        let codec = RustCodec::new();
        let image = codec.decode(&encode_test_png(16, 16)).unwrap();
        let bytes = codec
            .encode(
                &image,
                &EncodeParams {
                    format: OutputFormat::Avif,
                    quality: Quality::new(60),
                },
            )
            .unwrap();
        assert!(!bytes.is_empty());
    }
}
