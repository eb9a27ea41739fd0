//! High-level shrink operations.
//!
//! These functions combine formula evaluation and contain-fit with codec
//! execution. Resolution is pure; only [`apply_shrink`] touches pixels.

use super::backend::{CodecError, Dimensions, ImageCodec};
use super::calculations::{ResolutionError, contain_fit};
use crate::formula::{FormulaError, SizeSpec, evaluate, parse};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShrinkError {
    #[error("Invalid size formula: {0}")]
    Formula(#[from] FormulaError),
    #[error("Cannot resolve size: {0}")]
    Resolution(#[from] ResolutionError),
    #[error("Codec failed: {0}")]
    Codec(#[from] CodecError),
}

/// Resolve a width/height request against a source size.
///
/// Each axis is parsed and evaluated against its own source dimension, then
/// both are reconciled by [`contain_fit`].
pub fn resolve_shrink(
    width: &SizeSpec,
    height: &SizeSpec,
    source: Dimensions,
) -> Result<Dimensions, ShrinkError> {
    let width_axis = evaluate(&parse(width)?, source.width);
    let height_axis = evaluate(&parse(height)?, source.height);
    Ok(contain_fit(width_axis, height_axis, source)?)
}

/// Resolve a shrink against `image`'s current size and run it through the codec.
///
/// The codec is invoked even when the resolved size equals the current one;
/// it decides whether that is a no-op.
pub fn apply_shrink(
    codec: &dyn ImageCodec,
    image: DynamicImage,
    width: &SizeSpec,
    height: &SizeSpec,
) -> Result<DynamicImage, ShrinkError> {
    let target = resolve_shrink(width, height, Dimensions::of(&image))?;
    Ok(codec.resize(image, target)?)
}
