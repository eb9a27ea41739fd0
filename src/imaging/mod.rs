//! Image processing: dimension math plus the codec seam.
//!
//! | Operation | Where |
//! |---|---|
//! | **Contain-fit** | [`contain_fit`]: pure integer/float math |
//! | **Shrink resolution** | [`resolve_shrink`]: formulas + contain-fit |
//! | **Decode / resize / encode** | [`ImageCodec`], production impl [`RustCodec`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing codec operations
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Operations**: Functions combining formulas, calculations and a codec

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{CodecError, Dimensions, ImageCodec};
pub use calculations::{ResolutionError, contain_fit};
pub use operations::{ShrinkError, apply_shrink, resolve_shrink};
pub use params::{EncodeParams, OutputFormat, Quality, ResizeFilter};
pub use rust_backend::{RustCodec, is_supported_input, supported_input_extensions};
