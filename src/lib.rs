#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Product Studio
//!
//! Turns a raw product photo into a catalogue-ready composite: the product is
//! cut out of its original background, optionally brightened, given a soft
//! drop shadow, and centered on a canvas of a fixed aspect ratio over a solid
//! color, an image, or a generated background.
//!
//! ## Features
//!
//! - **Drop Shadows**: opacity, Gaussian blur and offset, never clipped
//! - **Fixed-Ratio Canvases**: ten aspect ratios from 9:16 to 21:9 with 20% padding
//! - **Backgrounds**: solid colors, stretched images or prompt-generated images
//! - **Pluggable Services**: background removal and generation behind async traits
//! - **Generated Background Cache**: one background per prompt and canvas size
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use product_studio::{
//!     AlphaPassthroughRemover, AspectRatio, CanvasRequest, ProductStudio, RgbColor,
//!     ShadowParams, StudioConfig,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut studio = ProductStudio::new(StudioConfig::default(), Box::new(AlphaPassthroughRemover))?;
//! let photo = image::open("mug.png")?;
//! let canvas = CanvasRequest::solid(AspectRatio::Portrait4x5, RgbColor::WHITE);
//!
//! let outcome = studio
//!     .run_pipeline(&photo, &ShadowParams::default(), &canvas)
//!     .await?;
//! if let Some(result) = outcome.composite() {
//!     result.save_png(result.suggested_file_name())?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Generated Backgrounds
//!
//! A prompt background is produced by a [`BackgroundGenerator`]. When it is
//! not cached yet, [`ProductStudio::run_pipeline`] stops with
//! [`PipelineOutcome::AwaitingBackground`]; generate it, then finish the
//! processed product:
//!
//! ```rust,no_run
//! use product_studio::{CanvasRequest, PipelineOutcome, ProductStudio, ShadowParams};
//!
//! # async fn example(studio: &mut ProductStudio, photo: image::DynamicImage) -> anyhow::Result<()> {
//! let canvas = CanvasRequest::generated(Default::default(), "marble countertop, morning light");
//! let outcome = studio.run_pipeline(&photo, &ShadowParams::default(), &canvas).await?;
//!
//! if let PipelineOutcome::AwaitingBackground { product, request } = outcome {
//!     if studio.generate_background(&request).await?.is_ready() {
//!         let finished = studio.composite_product(*product, &canvas)?;
//!         println!("{:?}", finished.stage());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface, tracing subscriber and progress spinner
//! - `tracing-json`: JSON log output for the CLI
//! - `tracing-files`: File log output for the CLI
//! - `webp-support`: WebP input decoding
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! product-studio = { version = "0.1", default-features = false }
//! ```

pub mod cache;
pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod collaborators;
pub mod compositor;
pub mod config;
pub mod enhance;
pub mod error;
pub mod processor;
pub mod services;
pub mod shadow;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

use tokio::io::AsyncRead;

// Public API exports
pub use cache::{BackgroundCache, BackgroundKey, CacheStats};
pub use canvas::{fit_canvas, CanvasLayout};
pub use collaborators::{
    AlphaPassthroughRemover, BackgroundGenerator, BackgroundRemover, HttpBackgroundGenerator,
    HttpBackgroundRemover,
};
pub use compositor::{BackgroundCompositor, BackgroundSource};
pub use config::{
    AspectRatio, BackgroundSpec, CanvasRequest, RgbColor, ShadowParams, StudioConfig,
    StudioConfigBuilder,
};
pub use enhance::adjust_brightness;
pub use error::{Result, StudioError, UpstreamError, UpstreamErrorKind, UpstreamService};
pub use processor::{preview_layout, ProductStudio};
pub use services::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressUpdate,
};
pub use shadow::{ShadowSynthesizer, ShadowedProduct};
pub use types::{
    BackgroundRequest, CompositeResult, GenerationOutcome, PipelineOutcome, PipelineStage,
    ProcessedProduct, ProcessingMetadata, ProcessingTimings,
};

#[cfg(feature = "cli")]
pub use tracing_config::{
    events, new_session_id, spans, TracingConfig, TracingFormat, TracingGuard, TracingOutput,
};

/// Composite a product photo given as encoded bytes
///
/// One-shot helper for callers without a long-lived [`ProductStudio`]. Only
/// color and image backgrounds are supported here, since a generated
/// background needs a generator and a cache.
///
/// # Examples
///
/// ```rust,no_run
/// use product_studio::{
///     composite_from_bytes, AlphaPassthroughRemover, CanvasRequest, ShadowParams, StudioConfig,
/// };
///
/// # async fn example(upload: Vec<u8>) -> anyhow::Result<()> {
/// let result = composite_from_bytes(
///     &upload,
///     StudioConfig::default(),
///     Box::new(AlphaPassthroughRemover),
///     &ShadowParams::default(),
///     &CanvasRequest::default(),
/// )
/// .await?;
/// let png = result.to_png_bytes()?;
/// # Ok(())
/// # }
/// ```
pub async fn composite_from_bytes(
    image_bytes: &[u8],
    config: StudioConfig,
    remover: Box<dyn BackgroundRemover>,
    shadow: &ShadowParams,
    canvas: &CanvasRequest,
) -> Result<CompositeResult> {
    if matches!(canvas.background, BackgroundSpec::Generated { .. }) {
        return Err(StudioError::invalid_config(
            "generated backgrounds need a ProductStudio with a generator",
        ));
    }

    let photo = image::load_from_memory(image_bytes)
        .map_err(|e| StudioError::invalid_input(format!("Failed to decode image from bytes: {}", e)))?;

    let mut studio = ProductStudio::new(config, remover)?;
    studio
        .run_pipeline(&photo, shadow, canvas)
        .await?
        .into_composite()
        .ok_or_else(|| StudioError::internal("pipeline stopped before compositing"))
}

/// Composite a product photo read from an async stream
///
/// # Examples
///
/// ```rust,no_run
/// use product_studio::{
///     composite_from_reader, AlphaPassthroughRemover, CanvasRequest, ShadowParams, StudioConfig,
/// };
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("mug.png").await?;
/// let result = composite_from_reader(
///     file,
///     StudioConfig::default(),
///     Box::new(AlphaPassthroughRemover),
///     &ShadowParams::default(),
///     &CanvasRequest::default(),
/// )
/// .await?;
/// result.save_png("mug_1-1.png")?;
/// # Ok(())
/// # }
/// ```
pub async fn composite_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    config: StudioConfig,
    remover: Box<dyn BackgroundRemover>,
    shadow: &ShadowParams,
    canvas: &CanvasRequest,
) -> Result<CompositeResult> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer)
        .await
        .map_err(|e| StudioError::processing(format!("Failed to read from stream: {}", e)))?;

    composite_from_bytes(&buffer, config, remover, shadow, canvas).await
}
