//! External collaborators of the pipeline
//!
//! Background removal and background generation are opaque services. The
//! pipeline only depends on the two traits below:
//! - [`BackgroundRemover`] turns a photo into a cutout (background alpha 0)
//! - [`BackgroundGenerator`] turns a prompt and canvas size into an image
//!
//! Adapters:
//! - [`AlphaPassthroughRemover`] for inputs that already carry a matte
//! - [`HttpBackgroundRemover`] and [`HttpBackgroundGenerator`] for HTTP services
//! - [`test_utils`] mocks with call history and failure injection

pub mod http;
pub mod passthrough;
pub mod test_utils;

pub use self::http::{HttpBackgroundGenerator, HttpBackgroundRemover};
pub use self::passthrough::AlphaPassthroughRemover;

use crate::error::UpstreamError;
use async_trait::async_trait;
use image::RgbaImage;

/// Removes the background from a photo
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Return a cutout with the same dimensions as `image`
    ///
    /// Background pixels must have alpha 0.
    ///
    /// # Errors
    /// - Any service failure, classified by [`crate::error::UpstreamErrorKind`]
    async fn remove_background(&self, image: &RgbaImage) -> Result<RgbaImage, UpstreamError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Generates a background image from a text prompt
#[async_trait]
pub trait BackgroundGenerator: Send + Sync {
    /// Generate a `width x height` background for `prompt`
    ///
    /// `Ok(None)` means the service answered without an image; the caller
    /// keeps waiting for a background rather than treating it as a failure.
    /// The returned image may have any size, it is resized to the canvas.
    ///
    /// # Errors
    /// - Any service failure, classified by [`crate::error::UpstreamErrorKind`]
    async fn generate(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> Result<Option<RgbaImage>, UpstreamError>;

    /// Short name for logs
    fn name(&self) -> &str;
}
