use clap::{Parser, Subcommand};
use ribs::imaging::{Dimensions, OutputFormat};
use ribs::pipeline::{Entry, Pipeline};
use ribs::process::{Job, JobManifest, OperationSpec};
use ribs::{config, imaging, output, process, validate};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ribs")]
#[command(version)]
#[command(about = "Shrink images to formula-driven sizes")]
#[command(long_about = "\
Shrink images to formula-driven sizes

Width and height are resolved independently against the source image, then
fitted inside the source while keeping its aspect ratio. Images are never
enlarged.

Size formulas:

  80          exactly 80 pixels
  0           derive from the other axis (same as omitting it)
  -10         trim 10 pixels from each edge (source - 20)
  x50 / 50%   50 percent of the source
  a10         add 10 pixels
  -10         inside a chain, subtract 10 (e.g. x50-10)
  r16         round down to a multiple of 16
  100x50a10   chains apply left to right from an optional base

Run 'ribs gen-config' to generate a documented ribs.toml.")]
struct Cli {
    /// Config file (defaults to ./ribs.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct SizeArgs {
    /// Width formula
    #[arg(long, allow_hyphen_values = true)]
    width: Option<String>,

    /// Height formula
    #[arg(long, allow_hyphen_values = true)]
    height: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Shrink an image (or every image in a directory)
    Shrink {
        /// Input file, directory, or '-' for stdin
        input: PathBuf,

        #[command(flatten)]
        size: SizeArgs,

        /// Output file or directory; '-' or omitted writes to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force the output format instead of inferring it
        #[arg(long, value_parser = parse_format)]
        format: Option<OutputFormat>,
    },
    /// Print the size a request resolves to, without touching any image
    Resolve {
        /// Source dimensions as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_dimensions)]
        source: Dimensions,

        #[command(flatten)]
        size: SizeArgs,
    },
    /// Run a JSON job manifest
    Batch {
        /// Path to the job manifest
        job: PathBuf,
    },
    /// Print a stock ribs.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Shrink {
            input,
            size,
            output,
            format,
        } => {
            let config = setup(cli.config.as_deref(), cli.verbose)?;
            let width = validate::validate_width(size.width.clone())?;
            let height = validate::validate_height(size.height.clone())?;

            if input.is_dir() {
                let Some(output_dir) = output.filter(|o| !is_stdio(o)) else {
                    return Err("a directory input needs an output directory (-o)".into());
                };
                let manifest = JobManifest {
                    jobs: vec![Job {
                        input,
                        output: output_dir,
                        operations: vec![OperationSpec::Shrink {
                            width: size_value(size.width),
                            height: size_value(size.height),
                        }],
                    }],
                };
                let codec = Arc::new(imaging::RustCodec::with_filter(config.resize.filter));
                let mut options = ribs::pipeline::EncodeOptions::from_config(&config);
                options.format = format;
                let report = process::run_with_codec(&manifest, Path::new(""), codec, options);
                output::print_batch_report(&report, Path::new(""));
                if report.failed() > 0 {
                    return Err(format!("{} of {} images failed", report.failed(), report.tasks.len()).into());
                }
                return Ok(());
            }

            let entry = if is_stdio(&input) {
                Entry::Reader(Box::new(io::stdin()))
            } else {
                Entry::Path(input.clone())
            };
            let mut pipeline = Pipeline::configured(entry, &config).shrink(width, height);
            if let Some(format) = format {
                pipeline = pipeline.with_format(format);
            }

            let destination = output.filter(|o| !is_stdio(o));
            let result = match &destination {
                Some(path) => pipeline.save(path)?,
                None => pipeline.pipe(&mut io::stdout().lock())?,
            };

            if cli.verbose > 0 || destination.is_some() {
                output::print_shrink_output(
                    result.source,
                    result.dimensions(),
                    result.format,
                    result.data.len(),
                    (!is_stdio(&input)).then_some(input.as_path()),
                    destination.as_deref(),
                );
            }
        }
        Command::Resolve { source, size } => {
            setup(cli.config.as_deref(), cli.verbose)?;
            let width = validate::validate_width(size.width)?;
            let height = validate::validate_height(size.height)?;
            let resolved = imaging::resolve_shrink(&width, &height, source)?;
            output::print_resolve_output(source, &width, &height, resolved);
        }
        Command::Batch { job } => {
            let config = setup(cli.config.as_deref(), cli.verbose)?;
            let report = process::run_manifest_file(&job, &config)?;
            let base = job.parent().unwrap_or_else(|| Path::new(""));
            output::print_batch_report(&report, base);
            if report.failed() > 0 {
                return Err(format!("{} of {} tasks failed", report.failed(), report.tasks.len()).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config, then install logging and the worker pool from it.
fn setup(path: Option<&Path>, verbose: u8) -> Result<config::RibsConfig, config::ConfigError> {
    let config = config::load_config(path)?;
    init_tracing(verbose, &config.logging.level);
    init_thread_pool(&config.processing);
    debug!(?config, "loaded config");
    Ok(config)
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins, then `-v`, then `[logging] level`.
fn init_tracing(verbose: u8, config_level: &str) {
    let fallback = match verbose {
        0 => config_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// CLI sizes as the raw JSON the batch runner expects.
fn size_value(spec: Option<String>) -> serde_json::Value {
    spec.map_or(serde_json::Value::Null, serde_json::Value::String)
}

fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width: u32 = w.trim().parse().map_err(|_| format!("invalid width '{w}'"))?;
    let height: u32 = h.trim().parse().map_err(|_| format!("invalid height '{h}'"))?;
    Ok(Dimensions::new(width, height))
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_extension(s).ok_or_else(|| format!("unsupported format '{s}'"))
}
