//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait is the pipeline's only contact with pixels:
//! decode the entry bytes, resize to dimensions the resolver already fixed,
//! and encode the final frame. Everything upstream of it is integer
//! arithmetic on [`Dimensions`].
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), built on the `image` crate.

use super::params::{EncodeParams, OutputFormat};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode {format}: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image, or of a resolved shrink target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Trait for image codecs.
///
/// Implementations must be shareable across the worker pool: pipelines hold
/// their codec behind an `Arc` and execute on rayon threads.
pub trait ImageCodec: Send + Sync {
    /// Decode raw file bytes into a frame.
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, CodecError>;

    /// Resample `image` to exactly `target`.
    fn resize(&self, image: DynamicImage, target: Dimensions)
    -> Result<DynamicImage, CodecError>;

    /// Encode a frame into file bytes.
    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, CodecError>;

    /// Sniff the container format of raw bytes, if it is one we can write.
    fn detect_format(&self, data: &[u8]) -> Option<OutputFormat> {
        image::guess_format(data)
            .ok()
            .and_then(OutputFormat::from_image_format)
    }
}
