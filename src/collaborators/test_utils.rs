//! Mock collaborators for testing the pipeline
//!
//! The mocks record every call so tests can verify which services the
//! orchestrator reached, and can be configured to fail, stall or answer
//! without an image.

use super::{BackgroundGenerator, BackgroundRemover};
use crate::error::UpstreamError;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn record(history: &Arc<Mutex<Vec<String>>>, call: String) {
    if let Ok(mut history) = history.lock() {
        history.push(call);
    }
}

fn snapshot(history: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    history.lock().map(|h| h.clone()).unwrap_or_default()
}

/// Mock background remover
///
/// By default it keeps pixels whose color differs from the top-left corner
/// pixel and makes everything else transparent, which is enough to cut a
/// product out of a flat studio backdrop.
#[derive(Debug, Clone)]
pub struct MockRemover {
    call_history: Arc<Mutex<Vec<String>>>,
    failure: Option<UpstreamError>,
    delay: Option<Duration>,
}

impl MockRemover {
    #[must_use]
    pub fn new() -> Self {
        Self {
            call_history: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            delay: None,
        }
    }

    /// A remover that always fails with `error`
    #[must_use]
    pub fn failing(error: UpstreamError) -> Self {
        let mut remover = Self::new();
        remover.failure = Some(error);
        remover
    }

    /// A remover that sleeps before answering
    #[must_use]
    pub fn delayed(delay: Duration) -> Self {
        let mut remover = Self::new();
        remover.delay = Some(delay);
        remover
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        snapshot(&self.call_history)
    }

    /// Number of removal calls so far
    pub fn call_count(&self) -> usize {
        self.get_call_history().len()
    }

    /// Transparent wherever the pixel matches the corner backdrop color
    #[must_use]
    pub fn key_out_backdrop(image: &RgbaImage) -> RgbaImage {
        let Some(&backdrop) = image.pixels().next() else {
            return image.clone();
        };
        let mut cutout = image.clone();
        for pixel in cutout.pixels_mut() {
            if pixel[0] == backdrop[0] && pixel[1] == backdrop[1] && pixel[2] == backdrop[2] {
                *pixel = Rgba([pixel[0], pixel[1], pixel[2], 0]);
            }
        }
        cutout
    }
}

impl Default for MockRemover {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackgroundRemover for MockRemover {
    async fn remove_background(&self, image: &RgbaImage) -> Result<RgbaImage, UpstreamError> {
        record(
            &self.call_history,
            format!("remove_background {}x{}", image.width(), image.height()),
        );

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(Self::key_out_backdrop(image))
    }

    fn name(&self) -> &str {
        "mock-remover"
    }
}

/// What the mock generator answers with
#[derive(Debug, Clone)]
enum GeneratorBehavior {
    /// Solid image of the requested size
    Solid(Rgba<u8>),
    /// `Ok(None)`
    Empty,
    /// `Err(error)`
    Fail(UpstreamError),
}

/// Mock background generator
#[derive(Debug, Clone)]
pub struct MockGenerator {
    call_history: Arc<Mutex<Vec<String>>>,
    behavior: GeneratorBehavior,
    delay: Option<Duration>,
}

impl MockGenerator {
    /// A generator that returns a solid image of the requested size
    #[must_use]
    pub fn solid(color: Rgba<u8>) -> Self {
        Self {
            call_history: Arc::new(Mutex::new(Vec::new())),
            behavior: GeneratorBehavior::Solid(color),
            delay: None,
        }
    }

    /// A generator that answers without an image
    #[must_use]
    pub fn empty() -> Self {
        let mut generator = Self::solid(Rgba([0, 0, 0, 255]));
        generator.behavior = GeneratorBehavior::Empty;
        generator
    }

    /// A generator that always fails with `error`
    #[must_use]
    pub fn failing(error: UpstreamError) -> Self {
        let mut generator = Self::solid(Rgba([0, 0, 0, 255]));
        generator.behavior = GeneratorBehavior::Fail(error);
        generator
    }

    /// Sleep before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        snapshot(&self.call_history)
    }

    /// Number of generation calls so far
    pub fn call_count(&self) -> usize {
        self.get_call_history().len()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::solid(Rgba([120, 160, 200, 255]))
    }
}

#[async_trait]
impl BackgroundGenerator for MockGenerator {
    async fn generate(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> Result<Option<RgbaImage>, UpstreamError> {
        record(
            &self.call_history,
            format!("generate '{}' {}x{}", prompt, width, height),
        );

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            GeneratorBehavior::Solid(color) => Ok(Some(RgbaImage::from_pixel(width, height, *color))),
            GeneratorBehavior::Empty => Ok(None),
            GeneratorBehavior::Fail(error) => Err(error.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock-generator"
    }
}

/// Photo of a solid product rectangle on a flat backdrop
#[must_use]
pub fn studio_photo(width: u32, height: u32, product: (u32, u32, u32, u32)) -> RgbaImage {
    let (px, py, pw, ph) = product;
    RgbaImage::from_fn(width, height, |x, y| {
        if x >= px && x < px + pw && y >= py && y < py + ph {
            Rgba([180, 60, 40, 255])
        } else {
            Rgba([240, 240, 240, 255])
        }
    })
}
