//! Lazy operation pipelines.
//!
//! A [`Pipeline`] has an *entry point* (a file path or any reader) and
//! accumulates operations through a fluent API. Nothing is read, decoded or
//! written until a *sink* is attached with [`Pipeline::finish`] (or one of
//! the synchronous terminals, [`Pipeline::run`] and [`Pipeline::save`]).
//! Every queued operation then runs in declaration order over a single decode
//! of the entry bytes, and the result is encoded once.
//!
//! ```text
//! Pipeline::open("in.png")      entry fixed, nothing read
//!     .shrink("x50", None)      descriptor queued
//!     .shrink(None, "r16")      descriptor queued
//!     .finish(Some(sink))       read → decode → shrink → shrink → encode → sink
//! ```
//!
//! ## Sinks
//!
//! | Sink | Execution | Returns |
//! |---|---|---|
//! | [`Sink::Callback`] | starts on the worker pool | `None` |
//! | [`Sink::Path`] | starts on the worker pool | `Some(Duplex)` onto the result |
//! | [`Sink::Writer`] | starts on the worker pool | `Some(Duplex)` onto the result |
//! | none | deferred until the [`Duplex`] is read, piped, saved or awaited | `Some(Duplex)` |
//!
//! Distinct pipelines share no state and can run concurrently. Within one
//! pipeline, operation *i*'s output size is operation *i+1*'s source size.
//!
//! ## Cancellation
//!
//! [`CancelHandle::cancel`] is checked before every codec call and before the
//! sink write. A codec call already in flight finishes, but its result is
//! dropped and nothing further runs.

use crate::config::RibsConfig;
use crate::formula::{FormulaError, SizeSpec};
use crate::imaging::{
    CodecError, Dimensions, EncodeParams, ImageCodec, OutputFormat, Quality, ResolutionError,
    RustCodec, ShrinkError, apply_shrink,
};
use std::fmt;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid size formula: {0}")]
    Formula(#[from] FormulaError),
    #[error("Cannot resolve size: {0}")]
    Resolution(#[from] ResolutionError),
    #[error("Codec failed: {0}")]
    Codec(#[from] CodecError),
    #[error("Pipeline was cancelled")]
    Cancelled,
    #[error("Pipeline worker stopped before reporting a result")]
    WorkerLost,
}

impl From<ShrinkError> for PipelineError {
    fn from(err: ShrinkError) -> Self {
        match err {
            ShrinkError::Formula(e) => Self::Formula(e),
            ShrinkError::Resolution(e) => Self::Resolution(e),
            ShrinkError::Codec(e) => Self::Codec(e),
        }
    }
}

/// Where a pipeline reads its source bytes from.
pub enum Entry {
    Path(PathBuf),
    Reader(Box<dyn Read + Send>),
}

impl Entry {
    fn read(self) -> io::Result<Vec<u8>> {
        match self {
            Self::Path(path) => std::fs::read(path),
            Self::Reader(mut reader) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                Ok(data)
            }
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Reader(_) => None,
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<PathBuf> for Entry {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for Entry {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for Entry {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

/// In-memory source bytes.
impl From<Vec<u8>> for Entry {
    fn from(data: Vec<u8>) -> Self {
        Self::Reader(Box::new(Cursor::new(data)))
    }
}

/// Completion callback. Invoked exactly once, on a worker thread.
pub type Callback = Box<dyn FnOnce(Result<Output, PipelineError>) + Send + 'static>;

/// Terminal consumer whose attachment triggers execution.
pub enum Sink {
    Callback(Callback),
    Path(PathBuf),
    Writer(Box<dyn Write + Send>),
}

impl Sink {
    pub fn callback(f: impl FnOnce(Result<Output, PipelineError>) + Send + 'static) -> Self {
        Self::Callback(Box::new(f))
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Self::Writer(Box::new(writer))
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

/// One queued transform. Immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationDescriptor {
    Shrink { width: SizeSpec, height: SizeSpec },
}

/// Encoded result of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// Size of the decoded entry, before any operation.
    pub source: Dimensions,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub data: Vec<u8>,
}

impl Output {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// How the final frame is encoded.
///
/// The format is chosen in this order: `format` if set, the destination
/// path's extension, the entry's own format, then `fallback`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EncodeOptions {
    pub format: Option<OutputFormat>,
    pub fallback: OutputFormat,
    pub quality: Quality,
}

impl EncodeOptions {
    pub fn from_config(config: &RibsConfig) -> Self {
        Self {
            format: None,
            fallback: config.encode.format,
            quality: Quality::new(config.encode.quality),
        }
    }

    fn pick_format(
        &self,
        destination: Option<&Path>,
        codec: &dyn ImageCodec,
        source: &[u8],
    ) -> OutputFormat {
        self.format
            .or_else(|| destination.and_then(OutputFormat::from_path))
            .or_else(|| codec.detect_format(source))
            .unwrap_or(self.fallback)
    }
}

/// Cooperative cancellation flag shared between a pipeline and its handles.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }
}

/// A lazily executed sequence of operations over one entry point.
pub struct Pipeline {
    entry: Entry,
    operations: Vec<OperationDescriptor>,
    codec: Arc<dyn ImageCodec>,
    options: EncodeOptions,
    cancel: CancelHandle,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("entry", &self.entry)
            .field("operations", &self.operations)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a pipeline over `entry` using the default [`RustCodec`].
    pub fn new(entry: impl Into<Entry>) -> Self {
        Self {
            entry: entry.into(),
            operations: Vec::new(),
            codec: Arc::new(RustCodec::new()),
            options: EncodeOptions::default(),
            cancel: CancelHandle::default(),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(Entry::Path(path.into()))
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::new(Entry::Reader(Box::new(reader)))
    }

    /// Codec, filter and encode settings taken from `config`.
    pub fn configured(entry: impl Into<Entry>, config: &RibsConfig) -> Self {
        Self::new(entry)
            .with_codec(Arc::new(RustCodec::with_filter(config.resize.filter)))
            .with_options(EncodeOptions::from_config(config))
    }

    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Force the output format regardless of sink or source.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.options.format = Some(format);
        self
    }

    /// Queue a contain-fit shrink. Nothing runs yet.
    pub fn shrink(mut self, width: impl Into<SizeSpec>, height: impl Into<SizeSpec>) -> Self {
        self.operations.push(OperationDescriptor::Shrink {
            width: width.into(),
            height: height.into(),
        });
        self
    }

    /// Queue an already-built descriptor.
    pub fn then(mut self, operation: OperationDescriptor) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Attach a sink, or get a deferred [`Duplex`] when there is none.
    ///
    /// Returns `None` when a callback was supplied: the callback is the
    /// only channel the result (or error) is delivered on.
    pub fn finish(self, sink: Option<Sink>) -> Option<Duplex> {
        match sink {
            None => Some(Duplex::pending(self)),
            Some(Sink::Callback(callback)) => {
                rayon::spawn(move || callback(self.run()));
                None
            }
            Some(Sink::Path(path)) => Some(self.spawn(move |pipeline| pipeline.save(&path))),
            Some(Sink::Writer(mut writer)) => {
                Some(self.spawn(move |pipeline| pipeline.pipe(&mut writer)))
            }
        }
    }

    fn spawn(
        self,
        job: impl FnOnce(Self) -> Result<Output, PipelineError> + Send + 'static,
    ) -> Duplex {
        let cancel = self.cancel_handle();
        let (tx, rx) = mpsc::channel();
        rayon::spawn(move || {
            // The receiver may already be gone; the sink write still happened
            let _ = tx.send(job(self));
        });
        Duplex {
            state: DuplexState::Running(rx),
            cancel,
        }
    }

    /// Execute on the current thread and return the encoded result.
    pub fn run(self) -> Result<Output, PipelineError> {
        self.execute(None)
    }

    /// Execute on the current thread and write the result to `path`.
    ///
    /// The output format follows the path's extension unless forced.
    pub fn save(self, path: &Path) -> Result<Output, PipelineError> {
        let cancel = self.cancel_handle();
        let output = self.execute(Some(path))?;
        cancel.check()?;
        std::fs::write(path, &output.data)?;
        info!(path = %path.display(), size = %output.dimensions(), "wrote output");
        Ok(output)
    }

    /// Execute on the current thread and stream the result into `writer`.
    pub fn pipe<W: Write + ?Sized>(self, writer: &mut W) -> Result<Output, PipelineError> {
        let cancel = self.cancel_handle();
        let output = self.execute(None)?;
        cancel.check()?;
        writer.write_all(&output.data)?;
        writer.flush()?;
        Ok(output)
    }

    fn execute(self, destination: Option<&Path>) -> Result<Output, PipelineError> {
        let Pipeline {
            entry,
            operations,
            codec,
            options,
            cancel,
        } = self;

        cancel.check()?;
        let label = entry
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stream>".to_string());
        let source = entry.read()?;

        cancel.check()?;
        let mut image = codec.decode(&source)?;
        let original = Dimensions::of(&image);
        debug!(
            entry = %label,
            size = %original,
            operations = operations.len(),
            "decoded entry"
        );

        for (index, operation) in operations.iter().enumerate() {
            cancel.check()?;
            match operation {
                OperationDescriptor::Shrink { width, height } => {
                    let before = Dimensions::of(&image);
                    image = apply_shrink(codec.as_ref(), image, width, height)?;
                    debug!(
                        index,
                        %width,
                        %height,
                        from = %before,
                        to = %Dimensions::of(&image),
                        "shrink"
                    );
                }
            }
        }

        if cancel.is_cancelled() {
            warn!(entry = %label, "cancelled, discarding result");
            return Err(PipelineError::Cancelled);
        }

        let format = options.pick_format(destination, codec.as_ref(), &source);
        let data = codec.encode(
            &image,
            &EncodeParams {
                format,
                quality: options.quality,
            },
        )?;
        let size = Dimensions::of(&image);
        debug!(entry = %label, %format, %size, bytes = data.len(), "encoded");

        Ok(Output {
            source: original,
            width: size.width,
            height: size.height,
            format,
            data,
        })
    }
}

/// Handle onto a pipeline's result, readable as a byte stream.
///
/// A duplex returned for a sink-less pipeline is inert: the pipeline runs
/// the first time the handle is read, piped, saved, awaited or given a
/// callback. A duplex returned alongside a path or writer sink is already
/// running and yields the same encoded bytes that went to that sink.
pub struct Duplex {
    state: DuplexState,
    cancel: CancelHandle,
}

enum DuplexState {
    Pending(Box<Pipeline>),
    Running(Receiver<Result<Output, PipelineError>>),
    Ready { output: Output, position: usize },
    Failed(PipelineError),
}

impl fmt::Debug for Duplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            DuplexState::Pending(_) => "pending",
            DuplexState::Running(_) => "running",
            DuplexState::Ready { .. } => "ready",
            DuplexState::Failed(_) => "failed",
        };
        f.debug_struct("Duplex").field("state", &state).finish()
    }
}

impl Duplex {
    fn pending(pipeline: Pipeline) -> Self {
        let cancel = pipeline.cancel_handle();
        Self {
            state: DuplexState::Pending(Box::new(pipeline)),
            cancel,
        }
    }

    /// True until something drives a sink-less pipeline.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, DuplexState::Pending(_))
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the result is available.
    pub fn wait(self) -> Result<Output, PipelineError> {
        match self.state {
            DuplexState::Pending(pipeline) => pipeline.run(),
            DuplexState::Running(rx) => rx.recv().unwrap_or(Err(PipelineError::WorkerLost)),
            DuplexState::Ready { output, .. } => Ok(output),
            DuplexState::Failed(err) => Err(err),
        }
    }

    /// Write the result into `writer`, running the pipeline first if needed.
    pub fn pipe<W: Write + ?Sized>(self, writer: &mut W) -> Result<Output, PipelineError> {
        let output = self.wait()?;
        writer.write_all(&output.data)?;
        writer.flush()?;
        Ok(output)
    }

    /// Write the result to `path`. A pending pipeline picks its output
    /// format from the path's extension.
    pub fn save(self, path: &Path) -> Result<Output, PipelineError> {
        match self.state {
            DuplexState::Pending(pipeline) => pipeline.save(path),
            _ => {
                let output = self.wait()?;
                std::fs::write(path, &output.data)?;
                Ok(output)
            }
        }
    }

    /// Deliver the result to `callback` once it is available.
    ///
    /// A pending pipeline runs on the worker pool. A running one is awaited
    /// on a plain thread so no pool worker blocks on a job queued behind it.
    pub fn on_finish(self, callback: impl FnOnce(Result<Output, PipelineError>) + Send + 'static) {
        match self.state {
            DuplexState::Pending(pipeline) => rayon::spawn(move || callback(pipeline.run())),
            DuplexState::Running(rx) => {
                std::thread::spawn(move || {
                    callback(rx.recv().unwrap_or(Err(PipelineError::WorkerLost)))
                });
            }
            DuplexState::Ready { output, .. } => callback(Ok(output)),
            DuplexState::Failed(err) => callback(Err(err)),
        }
    }

    /// Drive the pipeline to completion the first time bytes are requested.
    fn resolve(&mut self) -> io::Result<()> {
        let state = std::mem::replace(&mut self.state, DuplexState::Failed(PipelineError::WorkerLost));
        let result = match state {
            DuplexState::Pending(pipeline) => Some(pipeline.run()),
            DuplexState::Running(rx) => {
                Some(rx.recv().unwrap_or(Err(PipelineError::WorkerLost)))
            }
            settled => {
                self.state = settled;
                None
            }
        };
        if let Some(result) = result {
            self.state = match result {
                Ok(output) => DuplexState::Ready {
                    output,
                    position: 0,
                },
                Err(err) => DuplexState::Failed(err),
            };
        }
        match &self.state {
            DuplexState::Failed(err) => Err(io::Error::other(err.to_string())),
            _ => Ok(()),
        }
    }
}

impl Read for Duplex {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.resolve()?;
        match &mut self.state {
            DuplexState::Ready { output, position } => {
                let remaining = &output.data[*position..];
                let n = remaining.len().min(buf.len());
                buf[..n].copy_from_slice(&remaining[..n]);
                *position += n;
                Ok(n)
            }
            _ => Ok(0),
        }
    }
}
