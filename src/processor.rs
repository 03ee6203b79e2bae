//! Pipeline orchestrator
//!
//! `ProductStudio` drives a photo from upload to final canvas:
//! background removal, brightness, shadow, canvas fit and background
//! compositing. The only state it carries between runs is the generated
//! background cache and the last successful composite.

use crate::{
    cache::{BackgroundCache, CacheStats},
    canvas::{fit_canvas, CanvasLayout},
    collaborators::{BackgroundGenerator, BackgroundRemover},
    compositor::{BackgroundCompositor, BackgroundSource},
    config::{BackgroundSpec, CanvasRequest, ShadowParams, StudioConfig},
    enhance::adjust_brightness,
    error::{Result, StudioError, UpstreamError, UpstreamService},
    services::{NoOpProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate},
    shadow::ShadowSynthesizer,
    types::{
        BackgroundRequest, CompositeResult, GenerationOutcome, PipelineOutcome,
        ProcessedProduct, ProcessingMetadata,
    },
};
use image::{DynamicImage, RgbaImage};
use instant::Instant;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info as trace_info, info_span, instrument, span, Instrument, Level};

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Await an upstream call, converting an elapsed timeout into `UpstreamError`
async fn with_timeout<T, F>(timeout: Duration, call: F) -> std::result::Result<T, UpstreamError>
where
    F: Future<Output = std::result::Result<T, UpstreamError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::timeout(format!(
            "no response within {:.1}s",
            timeout.as_secs_f64()
        ))),
    }
}

/// Product photo compositor
pub struct ProductStudio {
    config: StudioConfig,
    remover: Box<dyn BackgroundRemover>,
    generator: Option<Box<dyn BackgroundGenerator>>,
    cache: BackgroundCache,
    last_composite: Option<CompositeResult>,
    reporter: Box<dyn ProgressReporter>,
}

impl ProductStudio {
    /// Create a studio with the given background remover
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn new(config: StudioConfig, remover: Box<dyn BackgroundRemover>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            remover,
            generator: None,
            cache: BackgroundCache::new(),
            last_composite: None,
            reporter: Box::new(NoOpProgressReporter),
        })
    }

    /// Attach a background generator for prompt backgrounds
    #[must_use]
    pub fn with_generator(mut self, generator: Box<dyn BackgroundGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Most recent successful composite; failed runs leave it untouched
    #[must_use]
    pub fn last_composite(&self) -> Option<&CompositeResult> {
        self.last_composite.as_ref()
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Forget the cached generated background
    pub fn invalidate_background_cache(&mut self) {
        self.cache.invalidate();
    }

    /// Run the whole pipeline on an uploaded photo
    ///
    /// With a generated background that is not cached yet, the run stops
    /// after the product is processed and returns
    /// [`PipelineOutcome::AwaitingBackground`]. Call
    /// [`ProductStudio::generate_background`] with the returned request, then
    /// [`ProductStudio::composite_product`] (or run the pipeline again).
    ///
    /// # Errors
    /// - `InvalidInput` for a zero-sized photo, an empty cutout, bad shadow
    ///   parameters or an empty prompt
    /// - `UpstreamUnavailable` when background removal fails or times out
    #[instrument(
        skip(self, photo, shadow, canvas),
        fields(
            remover = %self.remover.name(),
            aspect_ratio = %canvas.aspect_ratio,
            dimensions = %format!("{}x{}", photo.width(), photo.height())
        )
    )]
    pub async fn run_pipeline(
        &mut self,
        photo: &DynamicImage,
        shadow: &ShadowParams,
        canvas: &CanvasRequest,
    ) -> Result<PipelineOutcome> {
        let mut stage = ProcessingStage::BackgroundRemoval;
        let outcome = match self.process_product(photo, shadow, canvas, &mut stage).await {
            Ok(product) => self.composite_with_stage(product, canvas, &mut stage),
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            self.reporter.report_error(stage, &e.to_string());
            warn!("Pipeline failed during {}: {}", stage.description(), e);
        }
        outcome
    }

    /// Finish a processed product on the requested canvas
    ///
    /// # Errors
    /// - `InvalidInput` for an empty prompt or a zero-sized background image
    pub fn composite_product(
        &mut self,
        product: ProcessedProduct,
        canvas: &CanvasRequest,
    ) -> Result<PipelineOutcome> {
        let mut stage = ProcessingStage::CanvasFitting;
        let outcome = self.composite_with_stage(product, canvas, &mut stage);
        if let Err(e) = &outcome {
            self.reporter.report_error(stage, &e.to_string());
        }
        outcome
    }

    /// Generate and cache the background described by `request`
    ///
    /// Nothing is called when the background is already cached. A generator
    /// answer without an image leaves the cache untouched.
    ///
    /// # Errors
    /// - `InvalidConfig` when no generator is attached
    /// - `UpstreamUnavailable` when generation fails or times out
    #[instrument(
        skip(self, request),
        fields(width = request.width, height = request.height)
    )]
    pub async fn generate_background(
        &mut self,
        request: &BackgroundRequest,
    ) -> Result<GenerationOutcome> {
        let key = request.key();
        if self.cache.contains(&key) {
            debug!("Background already cached for {}", &key.digest()[..12]);
            return Ok(GenerationOutcome::AlreadyCached(key));
        }

        let generator = self.generator.as_ref().ok_or_else(|| {
            StudioError::invalid_config("No background generator configured for prompt backgrounds")
        })?;

        trace_info!(generator = %generator.name(), "Requesting generated background");
        let start = Instant::now();
        let generated = with_timeout(
            self.config.generation_timeout,
            generator.generate(&request.prompt, request.width, request.height),
        )
        .await
        .map_err(|e| StudioError::upstream(UpstreamService::BackgroundGeneration, e))?;

        match generated {
            Some(image) => {
                info!(
                    "Generated {}x{} background in {}ms",
                    image.width(),
                    image.height(),
                    elapsed_ms(start)
                );
                self.cache.insert(key.clone(), DynamicImage::ImageRgba8(image));
                Ok(GenerationOutcome::Generated(key))
            },
            None => {
                warn!("Background generator returned no image");
                Ok(GenerationOutcome::NoImage)
            },
        }
    }

    /// Uploaded -> Processed: cutout, brightness and shadow
    async fn process_product(
        &self,
        photo: &DynamicImage,
        shadow: &ShadowParams,
        canvas: &CanvasRequest,
        stage: &mut ProcessingStage,
    ) -> Result<ProcessedProduct> {
        let total_start = Instant::now();
        let input_dimensions = (photo.width(), photo.height());
        if input_dimensions.0 == 0 || input_dimensions.1 == 0 {
            return Err(StudioError::invalid_input(format!(
                "photo has zero size ({}x{})",
                input_dimensions.0, input_dimensions.1
            )));
        }
        shadow.validate()?;
        if let BackgroundSpec::Generated { prompt } = &canvas.background {
            if prompt.trim().is_empty() {
                return Err(StudioError::invalid_input("background prompt is empty"));
            }
        }

        let mut metadata = ProcessingMetadata::new(*shadow, self.config.brightness);
        metadata.input_dimensions = input_dimensions;
        metadata.remover = self.remover.name().to_string();

        *stage = ProcessingStage::BackgroundRemoval;
        self.report(*stage, total_start);
        let start = Instant::now();
        let cutout = self
            .remove_background(&photo.to_rgba8())
            .instrument(info_span!("remove_background", remover = %self.remover.name()))
            .await?;
        metadata.timings.background_removal_ms = elapsed_ms(start);

        let cutout = if (self.config.brightness - 1.0).abs() < f32::EPSILON {
            cutout
        } else {
            *stage = ProcessingStage::BrightnessAdjustment;
            self.report(*stage, total_start);
            let start = Instant::now();
            let adjusted = adjust_brightness(&cutout, self.config.brightness);
            metadata.timings.brightness_ms = elapsed_ms(start);
            adjusted
        };

        *stage = ProcessingStage::ShadowSynthesis;
        self.report(*stage, total_start);
        let shadowed = {
            let _span = span!(Level::DEBUG, "shadow", opacity = shadow.opacity, blur = shadow.blur_radius).entered();
            let start = Instant::now();
            let shadowed = ShadowSynthesizer::synthesize_rgba(&cutout, shadow)?;
            metadata.timings.shadow_ms = elapsed_ms(start);
            shadowed
        };

        metadata.product_dimensions = shadowed.dimensions();
        metadata.timings.total_ms = elapsed_ms(total_start);

        Ok(ProcessedProduct {
            image: shadowed.image,
            metadata,
        })
    }

    /// Processed -> Composited, or stop at the generated-background gate
    fn composite_with_stage(
        &mut self,
        product: ProcessedProduct,
        canvas: &CanvasRequest,
        stage: &mut ProcessingStage,
    ) -> Result<PipelineOutcome> {
        let start = Instant::now();

        *stage = ProcessingStage::CanvasFitting;
        self.report(*stage, start);
        let (layout, canvas_fit_ms) = {
            let _span = span!(Level::DEBUG, "fit_canvas").entered();
            let fit_start = Instant::now();
            let layout = fit_canvas(product.dimensions(), canvas.aspect_ratio)?;
            (layout, elapsed_ms(fit_start))
        };

        let background: Arc<DynamicImage>;
        let (source, background_kind) = match &canvas.background {
            BackgroundSpec::Color(color) => (BackgroundSource::Color(*color), "color"),
            BackgroundSpec::Image(image) => (BackgroundSource::Image(image.as_ref()), "image"),
            BackgroundSpec::Generated { prompt } => {
                if prompt.trim().is_empty() {
                    return Err(StudioError::invalid_input("background prompt is empty"));
                }
                let request = BackgroundRequest {
                    prompt: prompt.clone(),
                    width: layout.width,
                    height: layout.height,
                    aspect_ratio: canvas.aspect_ratio,
                };
                match self.cache.get(&request.key()) {
                    Some(image) => {
                        background = image;
                        (BackgroundSource::Image(background.as_ref()), "generated")
                    },
                    None => {
                        info!(
                            "Waiting for a generated {}x{} background",
                            request.width, request.height
                        );
                        return Ok(PipelineOutcome::AwaitingBackground {
                            product: Box::new(product),
                            request,
                        });
                    },
                }
            },
        };

        *stage = ProcessingStage::Compositing;
        self.report(*stage, start);
        let (image, compositing_ms) = {
            let _span = span!(Level::DEBUG, "composite", background = background_kind).entered();
            let composite_start = Instant::now();
            let image = BackgroundCompositor::composite(&product.image, &layout, &source)?;
            (image, elapsed_ms(composite_start))
        };

        let mut metadata = product.metadata;
        metadata.background_kind = background_kind.to_string();
        metadata.timings.canvas_fit_ms = canvas_fit_ms;
        metadata.timings.compositing_ms = compositing_ms;
        metadata.timings.total_ms += elapsed_ms(start);

        let result = CompositeResult {
            image,
            layout,
            aspect_ratio: canvas.aspect_ratio,
            metadata,
        };

        *stage = ProcessingStage::Completed;
        self.report(*stage, start);
        self.reporter.report_completion(&result.metadata.timings);
        trace_info!(
            width = layout.width,
            height = layout.height,
            total_ms = result.metadata.timings.total_ms,
            "Composite ready"
        );

        self.last_composite = Some(result.clone());
        Ok(PipelineOutcome::Composited(Box::new(result)))
    }

    async fn remove_background(&self, photo: &RgbaImage) -> Result<RgbaImage> {
        let cutout = with_timeout(
            self.config.removal_timeout,
            self.remover.remove_background(photo),
        )
        .await
        .map_err(|e| StudioError::upstream(UpstreamService::BackgroundRemoval, e))?;

        if cutout.dimensions() != photo.dimensions() {
            return Err(StudioError::upstream(
                UpstreamService::BackgroundRemoval,
                UpstreamError::invalid_response(format!(
                    "cutout is {}x{}, photo is {}x{}",
                    cutout.width(),
                    cutout.height(),
                    photo.width(),
                    photo.height()
                )),
            ));
        }
        Ok(cutout)
    }

    fn report(&self, stage: ProcessingStage, start: Instant) {
        self.reporter.report_progress(ProgressUpdate::new(stage, start));
    }
}

/// Layout the pipeline would use for a product of the given size
///
/// # Errors
/// - `InvalidInput` for a zero-sized product
pub fn preview_layout(product_size: (u32, u32), canvas: &CanvasRequest) -> Result<CanvasLayout> {
    fit_canvas(product_size, canvas.aspect_ratio)
}
