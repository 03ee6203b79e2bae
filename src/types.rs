//! Core types for pipeline results

use crate::{
    cache::BackgroundKey,
    canvas::CanvasLayout,
    config::{AspectRatio, ShadowParams},
    error::{Result, StudioError},
};
use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

/// Where a pipeline run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Photo received, nothing computed yet
    Uploaded,
    /// Cutout, brightness and shadow done; waiting for a background
    Processed,
    /// Final canvas rendered
    Composited,
}

/// Per-stage timing breakdown in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// External background removal call
    pub background_removal_ms: u64,

    /// Brightness adjustment (0 when skipped)
    pub brightness_ms: u64,

    /// Shadow synthesis including blur and crop
    pub shadow_ms: u64,

    /// Canvas layout computation
    pub canvas_fit_ms: u64,

    /// Background rendering and product compositing
    pub compositing_ms: u64,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time spent outside the measured stages
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.background_removal_ms
            + self.brightness_ms
            + self.shadow_ms
            + self.canvas_fit_ms
            + self.compositing_ms;
        self.total_ms.saturating_sub(measured)
    }
}

/// Processing metadata attached to a composite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub timings: ProcessingTimings,

    /// Size of the uploaded photo
    pub input_dimensions: (u32, u32),

    /// Size of the shadowed, cropped product
    pub product_dimensions: (u32, u32),

    pub shadow: ShadowParams,

    pub brightness: f32,

    /// Name of the background remover that produced the cutout
    pub remover: String,

    /// `"color"`, `"image"` or `"generated"`
    pub background_kind: String,

    pub processed_at: DateTime<Utc>,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new(shadow: ShadowParams, brightness: f32) -> Self {
        Self {
            timings: ProcessingTimings::new(),
            input_dimensions: (0, 0),
            product_dimensions: (0, 0),
            shadow,
            brightness,
            remover: String::new(),
            background_kind: String::new(),
            processed_at: Utc::now(),
        }
    }
}

/// Product after removal, brightness and shadow: ready for any background
#[derive(Debug, Clone)]
pub struct ProcessedProduct {
    /// Shadowed product cropped to its visible pixels
    pub image: RgbaImage,
    /// Metadata gathered so far; compositing fields are still empty
    pub metadata: ProcessingMetadata,
}

impl ProcessedProduct {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Everything needed to generate the missing background
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: AspectRatio,
}

impl BackgroundRequest {
    /// Cache key the generated image is stored under
    #[must_use]
    pub fn key(&self) -> BackgroundKey {
        BackgroundKey::new(self.prompt.clone(), self.width, self.height)
    }
}

/// Final opaque composite
#[derive(Debug, Clone)]
pub struct CompositeResult {
    pub image: RgbImage,
    pub layout: CanvasLayout,
    pub aspect_ratio: AspectRatio,
    pub metadata: ProcessingMetadata,
}

impl CompositeResult {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Download name, e.g. `product_16-9.png`
    #[must_use]
    pub fn suggested_file_name(&self) -> String {
        format!("product_{}.png", self.aspect_ratio.tag().replace(':', "-"))
    }

    /// Encode as PNG
    ///
    /// # Errors
    /// - PNG encoding failure
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Save as PNG
    ///
    /// # Errors
    /// - File cannot be written
    /// - PNG encoding failure
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_png_bytes()?;
        std::fs::write(path, bytes).map_err(|e| StudioError::file_io_error("write PNG", path, &e))?;
        log::info!(
            "Saved {}x{} composite to {}",
            self.image.width(),
            self.image.height(),
            path.display()
        );
        Ok(())
    }

    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }
}

/// Result of [`crate::ProductStudio::run_pipeline`]
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The canvas was rendered
    Composited(Box<CompositeResult>),
    /// A generated background is required and not cached yet
    AwaitingBackground {
        product: Box<ProcessedProduct>,
        request: BackgroundRequest,
    },
}

impl PipelineOutcome {
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Composited(_) => PipelineStage::Composited,
            Self::AwaitingBackground { .. } => PipelineStage::Processed,
        }
    }

    #[must_use]
    pub fn composite(&self) -> Option<&CompositeResult> {
        match self {
            Self::Composited(result) => Some(result),
            Self::AwaitingBackground { .. } => None,
        }
    }

    #[must_use]
    pub fn into_composite(self) -> Option<CompositeResult> {
        match self {
            Self::Composited(result) => Some(*result),
            Self::AwaitingBackground { .. } => None,
        }
    }

    #[must_use]
    pub fn background_request(&self) -> Option<&BackgroundRequest> {
        match self {
            Self::Composited(_) => None,
            Self::AwaitingBackground { request, .. } => Some(request),
        }
    }
}

/// Result of [`crate::ProductStudio::generate_background`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// A new background was generated and cached
    Generated(BackgroundKey),
    /// The background for this key was already cached; no call was made
    AlreadyCached(BackgroundKey),
    /// The generator answered without an image; nothing was cached
    NoImage,
}

impl GenerationOutcome {
    /// Whether a background for the request is now available
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !matches!(self, Self::NoImage)
    }
}
