//! CLI output formatting.
//!
//! Every command prints a short, information-first summary: the sizes
//! involved come first, paths are secondary context on indented lines.
//!
//! # Output Format
//!
//! ## Resolve
//!
//! ```text
//! 160x90 → 80x45
//!     width: x50
//!     height: auto
//! ```
//!
//! ## Shrink
//!
//! ```text
//! 160x90 → 89x50 (jpeg, 2481 bytes)
//!     Source: photos/dawn.png
//!     Output: thumbs/dawn.jpg
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 dawn.png → small/dawn.png
//!     160x90 → 80x45 (png, 9120 bytes)
//! 002 missing.png → small/missing.png
//!     Error: IO error: No such file or directory (os error 2)
//!
//! 1 succeeded, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::formula::SizeSpec;
use crate::imaging::{Dimensions, OutputFormat};
use crate::process::BatchReport;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `base` when it lives below it.
fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn size_change(source: Dimensions, output: Dimensions, format: OutputFormat, bytes: usize) -> String {
    format!("{} → {} ({}, {} bytes)", source, output, format, bytes)
}

// ============================================================================
// Resolve
// ============================================================================

pub fn format_resolve_output(
    source: Dimensions,
    width: &SizeSpec,
    height: &SizeSpec,
    resolved: Dimensions,
) -> Vec<String> {
    vec![
        format!("{} → {}", source, resolved),
        format!("{}width: {}", indent(1), width),
        format!("{}height: {}", indent(1), height),
    ]
}

pub fn print_resolve_output(
    source: Dimensions,
    width: &SizeSpec,
    height: &SizeSpec,
    resolved: Dimensions,
) {
    for line in format_resolve_output(source, width, height, resolved) {
        println!("{}", line);
    }
}

// ============================================================================
// Shrink
// ============================================================================

/// Summary of a single-file shrink. `output` is `None` when bytes went to stdout.
pub fn format_shrink_output(
    source: Dimensions,
    result: Dimensions,
    format: OutputFormat,
    bytes: usize,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Vec<String> {
    let mut lines = vec![size_change(source, result, format, bytes)];
    if let Some(input) = input {
        lines.push(format!("{}Source: {}", indent(1), input.display()));
    }
    if let Some(output) = output {
        lines.push(format!("{}Output: {}", indent(1), output.display()));
    }
    lines
}

/// Shrink summaries go to stderr so stdout can carry image bytes.
pub fn print_shrink_output(
    source: Dimensions,
    result: Dimensions,
    format: OutputFormat,
    bytes: usize,
    input: Option<&Path>,
    output: Option<&Path>,
) {
    for line in format_shrink_output(source, result, format, bytes, input, output) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

/// One header line per task, its result indented below, then a total.
pub fn format_batch_report(report: &BatchReport, base: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (pos, task) in report.tasks.iter().enumerate() {
        lines.push(format!(
            "{} {} → {}",
            format_index(pos + 1),
            display_path(&task.input, base),
            display_path(&task.output, base)
        ));
        match &task.outcome {
            Ok(resized) => lines.push(format!(
                "{}{}",
                indent(1),
                size_change(resized.source, resized.output, resized.format, resized.bytes)
            )),
            Err(err) => lines.push(format!("{}Error: {}", indent(1), err)),
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    ));
    lines
}

pub fn print_batch_report(report: &BatchReport, base: &Path) {
    for line in format_batch_report(report, base) {
        println!("{}", line);
    }
}
