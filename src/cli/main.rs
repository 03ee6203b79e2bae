//! Product Studio CLI
//!
//! Composites a product photo onto a fixed-aspect canvas from the command line.

use super::config::CliConfigBuilder;
use crate::{
    collaborators::{
        AlphaPassthroughRemover, BackgroundRemover, HttpBackgroundGenerator, HttpBackgroundRemover,
    },
    config::AspectRatio,
    processor::ProductStudio,
    services::{ConsoleProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate},
    tracing_config::{events, new_session_id, spans, TracingConfig, TracingFormat, TracingOutput},
    types::{CompositeResult, GenerationOutcome, PipelineOutcome, ProcessingTimings},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Instrument;

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored human-readable lines
    Console,
    /// Plain lines without colors
    Compact,
    /// One JSON object per event (requires the `tracing-json` feature)
    Json,
}

/// Product photo compositor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "product-studio")]
pub struct Cli {
    /// Product photo (PNG or JPEG; transparent PNGs work without a removal service)
    #[arg(value_name = "INPUT", required_unless_present = "list_ratios")]
    pub input: Option<PathBuf>,

    /// Output PNG file or directory [default: product_<ratio>.png]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output aspect ratio (see --list-ratios); unknown values fall back to 1:1
    #[arg(short, long, value_name = "RATIO")]
    pub aspect_ratio: Option<String>,

    /// Solid background color as hex (#RRGGBB or #RGB)
    #[arg(long, value_name = "HEX", conflicts_with_all = ["bg_image", "bg_prompt"])]
    pub bg_color: Option<String>,

    /// Background image, stretched to the canvas
    #[arg(long, value_name = "PATH", conflicts_with = "bg_prompt")]
    pub bg_image: Option<PathBuf>,

    /// Prompt for a generated background (requires --generator-url)
    #[arg(long, value_name = "PROMPT", requires = "generator_url")]
    pub bg_prompt: Option<String>,

    /// Background generation service endpoint
    #[arg(long, value_name = "URL")]
    pub generator_url: Option<String>,

    /// Background removal service endpoint [default: use the input's alpha channel]
    #[arg(long, value_name = "URL")]
    pub remover_url: Option<String>,

    /// Shadow opacity in percent (0-100)
    #[arg(long)]
    pub opacity: Option<u8>,

    /// Shadow blur radius in pixels (0-50)
    #[arg(long)]
    pub blur: Option<f32>,

    /// Horizontal shadow offset in pixels (-50..50)
    #[arg(long, allow_hyphen_values = true)]
    pub x_offset: Option<i32>,

    /// Vertical shadow offset in pixels (-50..100)
    #[arg(long, allow_hyphen_values = true)]
    pub y_offset: Option<i32>,

    /// Brightness factor for the product (1.0 = unchanged)
    #[arg(long)]
    pub brightness: Option<f32>,

    /// Timeout in seconds for each remote service call
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// JSON configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE); replaces the spinner with log lines
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Console)]
    pub log_format: LogFormat,

    /// Write logs to this file instead of stderr (requires the `tracing-files` feature)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// List supported aspect ratios and exit
    #[arg(long)]
    pub list_ratios: bool,
}

/// Shows pipeline stages on a spinner
struct SpinnerProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter for SpinnerProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.bar
            .set_message(format!("[{}%] {}", update.progress, update.description));
    }

    fn report_completion(&self, timings: &ProcessingTimings) {
        self.bar
            .set_message(format!("Composited in {}ms", timings.total_ms));
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.bar
            .set_message(format!("Failed while {}: {}", stage.description().to_lowercase(), error));
    }
}

/// Tracing setup selected by the logging flags
fn tracing_config(cli: &Cli, session_id: &str) -> Result<TracingConfig> {
    let format = match cli.log_format {
        LogFormat::Console => TracingFormat::Console,
        LogFormat::Compact => TracingFormat::Compact,
        #[cfg(feature = "tracing-json")]
        LogFormat::Json => TracingFormat::Json,
        #[cfg(not(feature = "tracing-json"))]
        LogFormat::Json => anyhow::bail!("--log-format json requires the tracing-json feature"),
    };

    let output = match &cli.log_file {
        None => TracingOutput::Console,
        #[cfg(feature = "tracing-files")]
        Some(path) => TracingOutput::File(path.clone()),
        #[cfg(not(feature = "tracing-files"))]
        Some(_) => anyhow::bail!("--log-file requires the tracing-files feature"),
    };

    Ok(TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(format)
        .with_output(output)
        .with_session_id(session_id))
}

/// Spinner when quiet, log lines when verbose
fn create_reporter(verbose: u8) -> Result<(Box<dyn ProgressReporter>, Option<ProgressBar>)> {
    if verbose > 0 {
        return Ok((Box::new(ConsoleProgressReporter::new(verbose > 1)), None));
    }
    let bar = create_spinner()?;
    Ok((
        Box::new(SpinnerProgressReporter { bar: bar.clone() }),
        Some(bar),
    ))
}

fn create_spinner() -> Result<ProgressBar> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_ratios {
        list_ratios();
        return Ok(());
    }

    let session_id = new_session_id();
    let _tracing_guard = tracing_config(&cli, &session_id)?
        .init()
        .context("Failed to initialize tracing")?;

    let input = cli
        .input
        .clone()
        .context("An input photo is required")?;
    let settings = CliConfigBuilder::from_cli(&cli).context("Invalid command-line arguments")?;

    let remover: Box<dyn BackgroundRemover> = match &cli.remover_url {
        Some(url) => Box::new(
            HttpBackgroundRemover::new(url.clone(), settings.config.removal_timeout)
                .context("Failed to create background removal client")?,
        ),
        None => Box::new(AlphaPassthroughRemover),
    };

    let session_span = spans::session(&session_id, remover.name());

    let (reporter, spinner) = create_reporter(cli.verbose)?;
    let mut studio = ProductStudio::new(settings.config.clone(), remover)
        .context("Failed to create product studio")?
        .with_progress_reporter(reporter);
    if let Some(url) = &cli.generator_url {
        studio = studio.with_generator(Box::new(
            HttpBackgroundGenerator::new(url.clone(), settings.config.generation_timeout)
                .context("Failed to create background generation client")?,
        ));
    }

    let outcome = process_file(&mut studio, &input, &settings)
        .instrument(spans::file_processing(&input, settings.canvas.aspect_ratio.tag()))
        .instrument(session_span)
        .await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let result = outcome.map_err(|e| {
        events::error_with_context(e.as_ref(), "processing product photo");
        e
    })?;

    let output_path = resolve_output_path(cli.output.as_deref(), &result);
    result
        .save_png(&output_path)
        .with_context(|| format!("Failed to save {}", output_path.display()))?;

    let (width, height) = result.dimensions();
    println!(
        "{} -> {} ({}x{}, {}ms)",
        input.display(),
        output_path.display(),
        width,
        height,
        result.metadata.timings.total_ms
    );
    Ok(())
}

/// Run the pipeline, generating the background first when one is requested
async fn process_file(
    studio: &mut ProductStudio,
    input: &Path,
    settings: &super::config::CliSettings,
) -> Result<CompositeResult> {
    let photo = image::open(input)
        .with_context(|| format!("Failed to open input image {}", input.display()))?;
    info!("Loaded {} ({}x{})", input.display(), photo.width(), photo.height());

    match studio
        .run_pipeline(&photo, &settings.shadow, &settings.canvas)
        .await?
    {
        PipelineOutcome::Composited(result) => Ok(*result),
        PipelineOutcome::AwaitingBackground { product, request } => {
            events::progress(&format!(
                "Generating {}x{} background",
                request.width, request.height
            ));
            match studio.generate_background(&request).await? {
                GenerationOutcome::NoImage => {
                    events::warning_with_recommendation(
                        "Background generator returned no image",
                        "retry or use --bg-color / --bg-image",
                    );
                    anyhow::bail!("No background was generated for the prompt")
                },
                GenerationOutcome::Generated(_) | GenerationOutcome::AlreadyCached(_) => studio
                    .composite_product(*product, &settings.canvas)?
                    .into_composite()
                    .context("Generated background was not available for compositing"),
            }
        },
    }
}

/// Output file: explicit path, `<dir>/product_<ratio>.png`, or the suggested name
fn resolve_output_path(output: Option<&Path>, result: &CompositeResult) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(result.suggested_file_name()),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(result.suggested_file_name()),
    }
}

fn list_ratios() {
    println!("Supported aspect ratios:");
    for ratio in AspectRatio::ALL {
        let (w, h) = ratio.ratio();
        let marker = if ratio == AspectRatio::default() { " (default)" } else { "" };
        println!("  {:<5} {}x{}{}", ratio.tag(), w, h, marker);
    }
}
