//! Background compositing onto the fitted canvas

use crate::{
    canvas::CanvasLayout,
    config::RgbColor,
    error::{Result, StudioError},
    utils::blend_over_rgb,
};
use image::{imageops::FilterType, DynamicImage, RgbImage, RgbaImage};
use tracing::{debug, instrument};

/// A background that is ready to paint: no pending generation
#[derive(Debug, Clone, Copy)]
pub enum BackgroundSource<'a> {
    /// Flat opaque color
    Color(RgbColor),
    /// Image stretched to exactly fill the canvas
    Image(&'a DynamicImage),
}

impl BackgroundSource<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Color(_) => "color",
            Self::Image(_) => "image",
        }
    }
}

/// Paints the background and places the product on top of it
pub struct BackgroundCompositor;

impl BackgroundCompositor {
    /// Render the background at the layout size
    ///
    /// # Errors
    /// - `InvalidInput` for a zero-sized layout or background image
    pub fn render_background(layout: &CanvasLayout, background: &BackgroundSource<'_>) -> Result<RgbImage> {
        if layout.width == 0 || layout.height == 0 {
            return Err(StudioError::invalid_input(format!(
                "canvas has zero size ({}x{})",
                layout.width, layout.height
            )));
        }

        match background {
            BackgroundSource::Color(color) => Ok(RgbImage::from_pixel(
                layout.width,
                layout.height,
                color.to_rgb(),
            )),
            BackgroundSource::Image(image) => {
                if image.width() == 0 || image.height() == 0 {
                    return Err(StudioError::invalid_input("background image has zero size"));
                }
                if (image.width(), image.height()) == layout.dimensions() {
                    return Ok(image.to_rgb8());
                }
                debug!(
                    from_width = image.width(),
                    from_height = image.height(),
                    to_width = layout.width,
                    to_height = layout.height,
                    "Resizing background image"
                );
                Ok(image
                    .resize_exact(layout.width, layout.height, FilterType::Lanczos3)
                    .to_rgb8())
            },
        }
    }

    /// Composite the product over the background at the layout's paste position
    ///
    /// Product pixels that fall outside the canvas are clipped.
    ///
    /// # Errors
    /// - `InvalidInput` for a zero-sized layout or background image
    #[instrument(
        skip(product, background),
        fields(background = background.kind(), width = layout.width, height = layout.height)
    )]
    pub fn composite(
        product: &RgbaImage,
        layout: &CanvasLayout,
        background: &BackgroundSource<'_>,
    ) -> Result<RgbImage> {
        let mut canvas = Self::render_background(layout, background)?;

        for (x, y, pixel) in product.enumerate_pixels() {
            if pixel[3] == 0 {
                continue;
            }
            let (Some(cx), Some(cy)) = (layout.paste_x.checked_add(x), layout.paste_y.checked_add(y)) else {
                continue;
            };
            if cx >= layout.width || cy >= layout.height {
                continue;
            }
            let target = canvas.get_pixel_mut(cx, cy);
            *target = blend_over_rgb(*target, *pixel);
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    fn layout(width: u32, height: u32, paste_x: u32, paste_y: u32) -> CanvasLayout {
        CanvasLayout {
            width,
            height,
            paste_x,
            paste_y,
        }
    }

    #[test]
    fn test_flat_color_outside_silhouette_is_exact() {
        let mut product = RgbaImage::new(10, 10);
        for y in 2..8 {
            for x in 2..8 {
                product.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let color = RgbColor::new(12, 34, 56);
        let out =
            BackgroundCompositor::composite(&product, &layout(20, 20, 5, 5), &BackgroundSource::Color(color))
                .unwrap();

        assert_eq!(out.dimensions(), (20, 20));
        for (x, y, pixel) in out.enumerate_pixels() {
            let inside = (7..13).contains(&x) && (7..13).contains(&y);
            if inside {
                assert_eq!(*pixel, Rgb([255, 0, 0]));
            } else {
                assert_eq!(*pixel, Rgb([12, 34, 56]), "at {},{}", x, y);
            }
        }
    }

    #[test]
    fn test_partial_alpha_blends_with_background() {
        let product = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 102]));
        let out = BackgroundCompositor::composite(
            &product,
            &layout(3, 3, 1, 1),
            &BackgroundSource::Color(RgbColor::WHITE),
        )
        .unwrap();
        // 255 * (1 - 0.4) = 153
        assert_eq!(*out.get_pixel(1, 1), Rgb([153, 153, 153]));
        assert_eq!(*out.get_pixel(0, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_image_background_is_resized_to_canvas() {
        let background = DynamicImage::ImageRgb8(RgbImage::from_pixel(7, 3, Rgb([0, 128, 0])));
        let product = RgbaImage::new(2, 2);
        let out = BackgroundCompositor::composite(
            &product,
            &layout(40, 30, 0, 0),
            &BackgroundSource::Image(&background),
        )
        .unwrap();

        assert_eq!(out.dimensions(), (40, 30));
        // Uniform color survives the resampling
        assert_eq!(*out.get_pixel(20, 15), Rgb([0, 128, 0]));
    }

    #[test]
    fn test_product_overflow_is_clipped() {
        let product = RgbaImage::from_pixel(10, 10, Rgba([9, 9, 9, 255]));
        let out = BackgroundCompositor::composite(
            &product,
            &layout(12, 12, 6, 6),
            &BackgroundSource::Color(RgbColor::BLACK),
        )
        .unwrap();
        assert_eq!(*out.get_pixel(11, 11), Rgb([9, 9, 9]));
        assert_eq!(*out.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_zero_sized_inputs_are_rejected() {
        let product = RgbaImage::new(1, 1);
        assert!(BackgroundCompositor::composite(
            &product,
            &layout(0, 5, 0, 0),
            &BackgroundSource::Color(RgbColor::WHITE)
        )
        .is_err());

        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(matches!(
            BackgroundCompositor::composite(&product, &layout(5, 5, 0, 0), &BackgroundSource::Image(&empty)),
            Err(StudioError::InvalidInput(_))
        ));
    }
}
