//! Background "removal" that trusts the input's own alpha channel

use super::BackgroundRemover;
use crate::error::UpstreamError;
use async_trait::async_trait;
use image::RgbaImage;

/// Returns the input unchanged
///
/// Useful for photos that are already cutouts (transparent PNGs) and for
/// running the pipeline without a removal service.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaPassthroughRemover;

#[async_trait]
impl BackgroundRemover for AlphaPassthroughRemover {
    async fn remove_background(&self, image: &RgbaImage) -> Result<RgbaImage, UpstreamError> {
        log::debug!(
            "Using existing alpha channel of {}x{} input",
            image.width(),
            image.height()
        );
        Ok(image.clone())
    }

    fn name(&self) -> &str {
        "alpha-passthrough"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[tokio::test]
    async fn test_passthrough_keeps_pixels() {
        let mut image = RgbaImage::new(4, 4);
        image.put_pixel(1, 2, Rgba([10, 20, 30, 40]));

        let out = AlphaPassthroughRemover.remove_background(&image).await.unwrap();
        assert_eq!(out, image);
        assert_eq!(AlphaPassthroughRemover.name(), "alpha-passthrough");
    }
}
