//! # ribs
//!
//! Lazy image shrink pipelines driven by per-axis size formulas.
//!
//! A shrink request names a width and a height independently. Each one may be
//! a number, a numeric string, or a small formula (`"x50"`, `"a10"`, `"r16"`,
//! `"-10"`) evaluated against the source image's size on that axis. The two
//! results are then fitted inside the source, keeping its aspect ratio, and
//! the image is never enlarged.
//!
//! ```no_run
//! use ribs::pipeline::{Pipeline, Sink};
//!
//! let handle = Pipeline::open("photo.jpg")
//!     .shrink("x50", None::<u32>)   // half width, height follows
//!     .shrink(None::<u32>, "r16")   // then snap height to a multiple of 16
//!     .finish(Some(Sink::path("thumb.webp")));
//! let output = handle.unwrap().wait()?;
//! println!("{}x{}", output.width, output.height);
//! # Ok::<(), ribs::pipeline::PipelineError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! SizeSpec ─▶ formula::parse ─▶ formula::evaluate ─┐  (per axis)
//!                                                   ├▶ imaging::contain_fit ─▶ Dimensions
//! SizeSpec ─▶ formula::parse ─▶ formula::evaluate ─┘
//!
//! Pipeline ── shrink … shrink ── finish(sink) ─▶ read ─▶ decode ─▶ resize … ─▶ encode ─▶ sink
//! ```
//!
//! Size resolution is pure arithmetic and never touches pixels, so it is
//! tested exhaustively without image files. Pixel work sits behind the
//! [`imaging::ImageCodec`] trait; pipelines only call it once a sink is
//! attached.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`formula`] | Size formula grammar: parsing and per-axis evaluation |
//! | [`imaging`] | Contain-fit math, the codec trait and its `image`-crate implementation |
//! | [`pipeline`] | Lazy operation pipelines, sinks, duplex handles and cancellation |
//! | [`validate`] | Argument shape checks and the [`shrink`] front door |
//! | [`process`] | JSON batch manifests run in parallel |
//! | [`config`] | `ribs.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Lazy Pipelines
//!
//! Chaining operations only records descriptors. The entry is read and
//! decoded once when a sink arrives, every operation runs on the in-memory
//! frame, and the result is encoded once. Two shrinks in a row cost one disk
//! read and one encode.
//!
//! ## Errors Travel With The Result
//!
//! Wrong argument *shapes* are rejected synchronously by [`validate`]. Bad
//! formula *syntax*, impossible sizes and codec failures surface while the
//! pipeline runs, through the same channel as the result: the callback, the
//! duplex handle, or the `Result` of a synchronous terminal.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding use the `image` crate only. The binary
//! has no system dependencies.

pub mod config;
pub mod formula;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod validate;

pub use formula::SizeSpec;
pub use imaging::Dimensions;
pub use pipeline::{CancelHandle, Duplex, Entry, Output, Pipeline, PipelineError, Sink};
pub use validate::{Arg, ArgumentTypeError, shrink};

#[cfg(test)]
pub(crate) mod test_helpers;
