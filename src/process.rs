//! Batch job runner.
//!
//! Reads a JSON job manifest, turns every job into one or more pipelines and
//! runs them in parallel.
//!
//! ## Manifest
//!
//! ```json
//! {
//!   "jobs": [
//!     {
//!       "input": "photos/dawn.jpg",
//!       "output": "thumbs/dawn.webp",
//!       "operations": [
//!         { "op": "shrink", "width": "x50", "height": null },
//!         { "op": "shrink", "width": 0, "height": "r16" }
//!       ]
//!     },
//!     { "input": "photos/", "output": "small/", "operations": [{ "op": "shrink", "width": 800 }] }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's directory. A directory
//! input is walked for supported images; each one becomes its own task
//! written under the output directory at the same relative path.
//!
//! ## Failure Handling
//!
//! A job that fails (bad size argument, unreadable input, formula error)
//! is reported on its own task rows. The rest of the batch still runs.
//!
//! ## Parallel Processing
//!
//! Tasks run on [rayon](https://docs.rs/rayon)'s pool, sized from
//! `[processing] max_processes`. Each task executes its pipeline
//! synchronously on the worker that picked it up.

use crate::config::RibsConfig;
use crate::imaging::{
    Dimensions, ImageCodec, OutputFormat, RustCodec, is_supported_input,
};
use crate::pipeline::{EncodeOptions, OperationDescriptor, Pipeline, PipelineError};
use crate::validate::{ArgumentTypeError, validate_height, validate_width};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid argument: {0}")]
    Argument(#[from] ArgumentTypeError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("No supported images found in {0}")]
    NoImages(PathBuf),
}

/// Top-level job file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobManifest {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

/// An operation as written in the manifest. Sizes stay raw JSON until
/// they are checked by [`validate`](crate::validate).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum OperationSpec {
    Shrink {
        #[serde(default)]
        width: serde_json::Value,
        #[serde(default)]
        height: serde_json::Value,
    },
}

impl OperationSpec {
    fn to_descriptor(&self) -> Result<OperationDescriptor, ArgumentTypeError> {
        match self {
            Self::Shrink { width, height } => Ok(OperationDescriptor::Shrink {
                width: validate_width(width.clone())?,
                height: validate_height(height.clone())?,
            }),
        }
    }
}

/// A successful task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resized {
    pub source: Dimensions,
    pub output: Dimensions,
    pub format: OutputFormat,
    pub bytes: usize,
}

/// Outcome of one input → output task.
#[derive(Debug)]
pub struct TaskReport {
    /// Index of the job in the manifest.
    pub job: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcome: Result<Resized, ProcessError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub tasks: Vec<TaskReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.tasks.iter().filter(|t| t.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.tasks.len() - self.succeeded()
    }
}

/// A planned unit of work: one file through one pipeline.
#[derive(Debug, Clone)]
struct Task {
    job: usize,
    input: PathBuf,
    output: PathBuf,
    operations: Vec<OperationDescriptor>,
}

pub fn load_manifest(path: &Path) -> Result<JobManifest, ProcessError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Run a manifest file with codec and encode settings from `config`.
pub fn run_manifest_file(path: &Path, config: &RibsConfig) -> Result<BatchReport, ProcessError> {
    let manifest = load_manifest(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let codec = Arc::new(RustCodec::with_filter(config.resize.filter));
    Ok(run_with_codec(
        &manifest,
        base_dir,
        codec,
        EncodeOptions::from_config(config),
    ))
}

/// Run every job of `manifest`, resolving relative paths against `base_dir`
/// (allows testing with a mock codec).
pub fn run_with_codec(
    manifest: &JobManifest,
    base_dir: &Path,
    codec: Arc<dyn ImageCodec>,
    options: EncodeOptions,
) -> BatchReport {
    let mut planned = Vec::new();
    let mut rejected = Vec::new();

    for (index, job) in manifest.jobs.iter().enumerate() {
        match plan_job(index, job, base_dir) {
            Ok(tasks) => planned.extend(tasks),
            Err(err) => {
                warn!(job = index, input = %job.input.display(), error = %err, "job rejected");
                rejected.push(TaskReport {
                    job: index,
                    input: base_dir.join(&job.input),
                    output: base_dir.join(&job.output),
                    outcome: Err(err),
                });
            }
        }
    }

    info!(
        jobs = manifest.jobs.len(),
        tasks = planned.len(),
        "running batch"
    );

    let mut tasks: Vec<TaskReport> = planned
        .into_par_iter()
        .map(|task| run_task(task, codec.clone(), options))
        .collect();
    tasks.extend(rejected);
    tasks.sort_by_key(|t| t.job);

    BatchReport { tasks }
}

fn plan_job(index: usize, job: &Job, base_dir: &Path) -> Result<Vec<Task>, ProcessError> {
    let operations = job
        .operations
        .iter()
        .map(OperationSpec::to_descriptor)
        .collect::<Result<Vec<_>, _>>()?;

    let input = base_dir.join(&job.input);
    let output = base_dir.join(&job.output);
    let tasks = expand_inputs(&input, &output)?
        .into_iter()
        .map(|(input, output)| Task {
            job: index,
            input,
            output,
            operations: operations.clone(),
        })
        .collect();
    Ok(tasks)
}

/// Pair every input file with its output path.
///
/// A file input maps to `output` itself. A directory input maps each
/// supported image below it to the same relative path under `output`.
pub fn expand_inputs(input: &Path, output: &Path) -> Result<Vec<(PathBuf, PathBuf)>, ProcessError> {
    if !input.is_dir() {
        return Ok(vec![(input.to_path_buf(), output.to_path_buf())]);
    }

    let mut pairs = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || !is_supported_input(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(input).unwrap_or(entry.path());
        pairs.push((entry.path().to_path_buf(), output.join(relative)));
    }

    if pairs.is_empty() {
        return Err(ProcessError::NoImages(input.to_path_buf()));
    }
    debug!(dir = %input.display(), files = pairs.len(), "expanded directory input");
    Ok(pairs)
}

fn run_task(task: Task, codec: Arc<dyn ImageCodec>, options: EncodeOptions) -> TaskReport {
    let Task {
        job,
        input,
        output,
        operations,
    } = task;

    let outcome = execute(&input, &output, operations, codec, options);
    match &outcome {
        Ok(resized) => info!(
            job,
            input = %input.display(),
            from = %resized.source,
            to = %resized.output,
            "done"
        ),
        Err(err) => warn!(job, input = %input.display(), error = %err, "failed"),
    }

    TaskReport {
        job,
        input,
        output,
        outcome,
    }
}

fn execute(
    input: &Path,
    output: &Path,
    operations: Vec<OperationDescriptor>,
    codec: Arc<dyn ImageCodec>,
    options: EncodeOptions,
) -> Result<Resized, ProcessError> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pipeline = operations.into_iter().fold(
        Pipeline::open(input).with_codec(codec).with_options(options),
        Pipeline::then,
    );
    let result = pipeline.save(output)?;

    Ok(Resized {
        source: result.source,
        output: result.dimensions(),
        format: result.format,
        bytes: result.data.len(),
    })
}
