//! Argument validation and the `shrink` front door.
//!
//! Callers hand over loosely shaped values ([`Arg`]); this module decides
//! once, before any I/O, whether each one is acceptable for its position.
//! After that point the pipeline works with strong types only.
//!
//! | Position | Accepted shapes |
//! |---|---|
//! | source | non-empty text (a path) or a reader |
//! | width, height | absent, number or text |
//! | sink | absent, callback, text (a path) or a writer |

use crate::formula::SizeSpec;
use crate::pipeline::{Callback, Duplex, Entry, Output, Pipeline, PipelineError, Sink};
use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentTypeError {
    #[error("filename should be a string or object")]
    Filename,
    #[error("filename should not be empty")]
    EmptyFilename,
    #[error("width should be a number or string")]
    Width,
    #[error("height should be a number or string")]
    Height,
    #[error("callback should be a function or string")]
    Callback,
}

/// A caller-supplied value of not-yet-checked shape.
pub enum Arg {
    Absent,
    Number(f64),
    Text(String),
    Reader(Box<dyn Read + Send>),
    Writer(Box<dyn Write + Send>),
    Callback(Callback),
    /// Anything else; the string names the shape for diagnostics.
    Unsupported(&'static str),
}

impl Arg {
    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Self::Writer(Box::new(writer))
    }

    pub fn callback(f: impl FnOnce(Result<Output, PipelineError>) + Send + 'static) -> Self {
        Self::Callback(Box::new(f))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::Reader(_) => "reader",
            Self::Writer(_) => "writer",
            Self::Callback(_) => "callback",
            Self::Unsupported(kind) => kind,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            other => write!(f, "{}", other.kind()),
        }
    }
}

macro_rules! arg_from_number {
    ($($t:ty),*) => {
        $(impl From<$t> for Arg {
            fn from(n: $t) -> Self {
                Self::Number(n as f64)
            }
        })*
    };
}

arg_from_number!(i32, i64, u32, u64, f32, f64);

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<PathBuf> for Arg {
    fn from(path: PathBuf) -> Self {
        Self::Text(path.to_string_lossy().into_owned())
    }
}

impl From<bool> for Arg {
    fn from(_: bool) -> Self {
        Self::Unsupported("boolean")
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl From<Box<dyn Read + Send>> for Arg {
    fn from(reader: Box<dyn Read + Send>) -> Self {
        Self::Reader(reader)
    }
}

impl From<Callback> for Arg {
    fn from(callback: Callback) -> Self {
        Self::Callback(callback)
    }
}

/// JSON null, numbers and strings map onto their obvious shapes.
impl From<serde_json::Value> for Arg {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Absent,
            Value::Number(n) => n
                .as_f64()
                .map_or(Self::Unsupported("number"), Self::Number),
            Value::String(s) => Self::Text(s),
            Value::Bool(_) => Self::Unsupported("boolean"),
            Value::Array(_) => Self::Unsupported("array"),
            Value::Object(_) => Self::Unsupported("object"),
        }
    }
}

/// Check a pipeline entry point.
pub fn validate_source(source: Arg) -> Result<Entry, ArgumentTypeError> {
    match source {
        Arg::Text(path) if path.trim().is_empty() => Err(ArgumentTypeError::EmptyFilename),
        Arg::Text(path) => Ok(Entry::Path(PathBuf::from(path))),
        Arg::Reader(reader) => Ok(Entry::Reader(reader)),
        _ => Err(ArgumentTypeError::Filename),
    }
}

/// Check one size argument. `error` is returned for any other shape.
///
/// Only the shape is checked here; formula syntax is checked when the
/// pipeline runs.
pub fn validate_size(arg: Arg, error: ArgumentTypeError) -> Result<SizeSpec, ArgumentTypeError> {
    match arg {
        Arg::Absent => Ok(SizeSpec::Absent),
        Arg::Number(n) => Ok(SizeSpec::Number(n)),
        Arg::Text(s) => Ok(SizeSpec::Text(s)),
        _ => Err(error),
    }
}

pub fn validate_width(arg: impl Into<Arg>) -> Result<SizeSpec, ArgumentTypeError> {
    validate_size(arg.into(), ArgumentTypeError::Width)
}

pub fn validate_height(arg: impl Into<Arg>) -> Result<SizeSpec, ArgumentTypeError> {
    validate_size(arg.into(), ArgumentTypeError::Height)
}

/// Check a terminal sink. Absent means "no sink yet".
pub fn validate_sink(sink: Arg) -> Result<Option<Sink>, ArgumentTypeError> {
    match sink {
        Arg::Absent => Ok(None),
        Arg::Callback(callback) => Ok(Some(Sink::Callback(callback))),
        Arg::Text(path) if path.trim().is_empty() => Err(ArgumentTypeError::Callback),
        Arg::Text(path) => Ok(Some(Sink::Path(PathBuf::from(path)))),
        Arg::Writer(writer) => Ok(Some(Sink::Writer(writer))),
        _ => Err(ArgumentTypeError::Callback),
    }
}

/// Shrink `source` to fit within `width` × `height` and hand the result to `sink`.
///
/// All four arguments are checked before anything is read or queued.
/// With a callback sink the result is delivered only to the callback and
/// `Ok(None)` is returned. Otherwise a [`Duplex`] is returned: already
/// running for a path or writer sink, inert until driven when there is no
/// sink.
///
/// ```no_run
/// let duplex = ribs::shrink("photo.jpg", "x50", None::<u32>, "thumb.jpg")?.unwrap();
/// let output = duplex.wait()?;
/// println!("{}x{}", output.width, output.height);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn shrink(
    source: impl Into<Arg>,
    width: impl Into<Arg>,
    height: impl Into<Arg>,
    sink: impl Into<Arg>,
) -> Result<Option<Duplex>, ArgumentTypeError> {
    let entry = validate_source(source.into())?;
    let width = validate_width(width)?;
    let height = validate_height(height)?;
    let sink = validate_sink(sink.into())?;
    Ok(Pipeline::new(entry).shrink(width, height).finish(sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn numbers_and_text_convert() {
        assert!(matches!(Arg::from(80), Arg::Number(n) if n == 80.0));
        assert!(matches!(Arg::from(-10i64), Arg::Number(n) if n == -10.0));
        assert!(matches!(Arg::from(2.5f64), Arg::Number(n) if n == 2.5));
        assert!(matches!(Arg::from("x50"), Arg::Text(ref s) if s == "x50"));
        assert!(matches!(Arg::from(None::<u32>), Arg::Absent));
        assert!(matches!(Arg::from(Some("r8")), Arg::Text(_)));
    }

    #[test]
    fn json_values_convert() {
        assert!(matches!(Arg::from(json!(null)), Arg::Absent));
        assert!(matches!(Arg::from(json!(45)), Arg::Number(n) if n == 45.0));
        assert!(matches!(Arg::from(json!("a50r160")), Arg::Text(_)));
        assert!(matches!(Arg::from(json!(true)), Arg::Unsupported("boolean")));
        assert!(matches!(Arg::from(json!([1])), Arg::Unsupported("array")));
        assert!(matches!(Arg::from(json!({})), Arg::Unsupported("object")));
    }

    // =========================================================================
    // Positions
    // =========================================================================

    #[test]
    fn source_accepts_path_or_reader() {
        assert!(matches!(
            validate_source("in.png".into()),
            Ok(Entry::Path(p)) if p == PathBuf::from("in.png")
        ));
        assert!(matches!(
            validate_source(Arg::reader(Cursor::new(vec![1u8]))),
            Ok(Entry::Reader(_))
        ));
    }

    #[test]
    fn source_rejects_other_shapes() {
        for arg in [Arg::Absent, Arg::from(12), Arg::from(json!({"a": 1}))] {
            assert_eq!(
                validate_source(arg).unwrap_err().to_string(),
                "filename should be a string or object"
            );
        }
        assert_eq!(
            validate_source(Arg::callback(|_| {})).unwrap_err(),
            ArgumentTypeError::Filename
        );
    }

    #[test]
    fn source_rejects_empty_path() {
        assert_eq!(
            validate_source("".into()).unwrap_err(),
            ArgumentTypeError::EmptyFilename
        );
        assert_eq!(
            validate_source("   ".into()).unwrap_err(),
            ArgumentTypeError::EmptyFilename
        );
    }

    #[test]
    fn sizes_accept_absent_number_text() {
        assert_eq!(validate_width(None::<u32>).unwrap(), SizeSpec::Absent);
        assert_eq!(validate_width(80).unwrap(), SizeSpec::Number(80.0));
        assert_eq!(
            validate_height("x50").unwrap(),
            SizeSpec::Text("x50".into())
        );
    }

    #[test]
    fn sizes_report_their_position() {
        assert_eq!(
            validate_width(true).unwrap_err().to_string(),
            "width should be a number or string"
        );
        assert_eq!(
            validate_height(json!([80])).unwrap_err().to_string(),
            "height should be a number or string"
        );
    }

    #[test]
    fn sink_shapes() {
        assert!(validate_sink(Arg::Absent).unwrap().is_none());
        assert!(matches!(
            validate_sink(Arg::callback(|_| {})),
            Ok(Some(Sink::Callback(_)))
        ));
        assert!(matches!(
            validate_sink("out.png".into()),
            Ok(Some(Sink::Path(_)))
        ));
        assert!(matches!(
            validate_sink(Arg::writer(Vec::new())),
            Ok(Some(Sink::Writer(_)))
        ));
        assert_eq!(
            validate_sink(Arg::from(3)).unwrap_err().to_string(),
            "callback should be a function or string"
        );
    }

    // =========================================================================
    // Front door
    // =========================================================================

    #[test]
    fn shrink_checks_arguments_in_order() {
        let err = shrink(Arg::Absent, true, true, true).unwrap_err();
        assert_eq!(err, ArgumentTypeError::Filename);
        let err = shrink("in.png", true, true, true).unwrap_err();
        assert_eq!(err, ArgumentTypeError::Width);
        let err = shrink("in.png", 10, true, true).unwrap_err();
        assert_eq!(err, ArgumentTypeError::Height);
        let err = shrink("in.png", 10, 10, true).unwrap_err();
        assert_eq!(err, ArgumentTypeError::Callback);
    }

    #[test]
    fn shrink_without_sink_is_inert() {
        let duplex = shrink("/nonexistent/in.png", 80, 45, None::<u32>)
            .unwrap()
            .unwrap();
        assert!(duplex.is_pending());
    }

    #[test]
    fn shrink_with_callback_returns_none() {
        let (tx, rx) = std::sync::mpsc::channel();
        let ret = shrink(
            "/nonexistent/in.png",
            80,
            45,
            Arg::callback(move |r| tx.send(r.is_err()).unwrap()),
        )
        .unwrap();

        assert!(ret.is_none());
        assert!(
            rx.recv_timeout(std::time::Duration::from_secs(10))
                .unwrap()
        );
    }
}
