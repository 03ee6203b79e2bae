//! Drop shadow synthesis
//!
//! The product's own alpha matte is reused as a stencil for a uniform black
//! shadow. The stencil is offset on an oversized transparent canvas, blurred,
//! and the unblurred product is composited on top before the result is
//! cropped to its visible pixels.

use crate::{
    config::ShadowParams,
    error::{Result, StudioError},
    utils::{alpha_bounding_box, blend_over_rgba},
};
use image::{imageops, DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, instrument};

/// Minimum transparent margin around the product on the working canvas
pub const SHADOW_CANVAS_MARGIN: u32 = 100;

/// Product with its drop shadow, cropped to visible pixels
#[derive(Debug, Clone)]
pub struct ShadowedProduct {
    /// Shadow and product, no fully transparent border
    pub image: RgbaImage,
    /// Where the cutout's top-left corner landed in `image`
    ///
    /// Negative when the cutout itself had a transparent border that was cropped.
    pub product_origin: (i64, i64),
}

impl ShadowedProduct {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Shadow alpha for a product pixel: `round(alpha * level / 255)`
fn stencil_alpha(alpha: u8, level: u8) -> u8 {
    ((u32::from(alpha) * u32::from(level) + 127) / 255) as u8
}

/// Pixels a blur of `radius` can spread the shadow: `ceil(3 * radius)`
#[must_use]
pub fn blur_extent(radius: f32) -> u32 {
    if radius.is_finite() && radius > 0.0 {
        (radius * 3.0).ceil() as u32
    } else {
        0
    }
}

/// Uniform shadow level for an opacity percentage: `round(255 * opacity / 100)`
#[must_use]
pub fn shadow_level(opacity: u8) -> u8 {
    ((u32::from(opacity.min(100)) * 255 + 50) / 100) as u8
}

/// Drop shadow synthesizer
pub struct ShadowSynthesizer;

impl ShadowSynthesizer {
    /// Add a drop shadow to a cutout of any color type
    ///
    /// Images without an alpha channel are promoted to fully opaque RGBA.
    ///
    /// # Errors
    /// - `InvalidInput` for out-of-range parameters
    /// - `InvalidInput` for a zero-sized or fully transparent cutout
    pub fn synthesize(cutout: &DynamicImage, params: &ShadowParams) -> Result<ShadowedProduct> {
        let rgba = cutout.to_rgba8();
        Self::synthesize_rgba(&rgba, params)
    }

    /// Add a drop shadow to an RGBA cutout
    ///
    /// # Errors
    /// - `InvalidInput` for out-of-range parameters
    /// - `InvalidInput` for a zero-sized or fully transparent cutout
    #[instrument(
        skip(cutout),
        fields(width = cutout.width(), height = cutout.height())
    )]
    pub fn synthesize_rgba(cutout: &RgbaImage, params: &ShadowParams) -> Result<ShadowedProduct> {
        params.validate()?;

        let (width, height) = cutout.dimensions();
        if width == 0 || height == 0 {
            return Err(StudioError::invalid_input(format!(
                "cutout has zero size ({}x{})",
                width, height
            )));
        }
        if alpha_bounding_box(cutout).is_none() {
            return Err(StudioError::invalid_input(
                "cutout has an empty alpha matte (every pixel is transparent)",
            ));
        }

        let level = shadow_level(params.opacity);
        let offset_extent = params.x_offset.unsigned_abs().max(params.y_offset.unsigned_abs());
        let margin = SHADOW_CANVAS_MARGIN.max(offset_extent + blur_extent(params.blur_radius));

        let canvas_width = width + 2 * margin;
        let canvas_height = height + 2 * margin;
        debug!(
            canvas_width,
            canvas_height, margin, shadow_level = level, "Allocated shadow canvas"
        );

        let stencil = Self::shadow_stencil(cutout, params, level, margin, canvas_width, canvas_height);
        // gaussian_blur_f32 rejects a zero sigma; radius 0 keeps the hard edge
        let shadow = if params.blur_radius > 0.0 {
            gaussian_blur_f32(&stencil, params.blur_radius)
        } else {
            stencil
        };

        let mut canvas = RgbaImage::from_fn(canvas_width, canvas_height, |x, y| {
            Rgba([0, 0, 0, shadow.get_pixel(x, y)[0]])
        });

        for (x, y, pixel) in cutout.enumerate_pixels() {
            let target = canvas.get_pixel_mut(x + margin, y + margin);
            *target = blend_over_rgba(*target, *pixel);
        }

        let bounds = alpha_bounding_box(&canvas).ok_or_else(|| {
            StudioError::internal("shadow canvas lost all coverage during compositing")
        })?;
        let image = imageops::crop_imm(&canvas, bounds.x, bounds.y, bounds.width, bounds.height)
            .to_image();

        debug!(
            output_width = bounds.width,
            output_height = bounds.height,
            "Cropped shadowed product"
        );

        Ok(ShadowedProduct {
            image,
            product_origin: (
                i64::from(margin) - i64::from(bounds.x),
                i64::from(margin) - i64::from(bounds.y),
            ),
        })
    }

    /// Unblurred shadow alpha, already placed at its offset on the canvas
    fn shadow_stencil(
        cutout: &RgbaImage,
        params: &ShadowParams,
        level: u8,
        margin: u32,
        canvas_width: u32,
        canvas_height: u32,
    ) -> GrayImage {
        let mut stencil = GrayImage::new(canvas_width, canvas_height);
        if level == 0 {
            return stencil;
        }

        let origin_x = i64::from(margin) + i64::from(params.x_offset);
        let origin_y = i64::from(margin) + i64::from(params.y_offset);

        for (x, y, pixel) in cutout.enumerate_pixels() {
            let alpha = stencil_alpha(pixel[3], level);
            if alpha == 0 {
                continue;
            }
            let cx = origin_x + i64::from(x);
            let cy = origin_y + i64::from(y);
            if cx < 0 || cy < 0 || cx >= i64::from(canvas_width) || cy >= i64::from(canvas_height) {
                continue;
            }
            stencil.put_pixel(cx as u32, cy as u32, Luma([alpha]));
        }

        stencil
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque_block(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]))
    }

    fn params(opacity: u8, blur: f32, x: i32, y: i32) -> ShadowParams {
        ShadowParams::new(opacity, blur, x, y).unwrap()
    }

    #[test]
    fn test_shadow_level_rounding() {
        assert_eq!(shadow_level(0), 0);
        assert_eq!(shadow_level(60), 153);
        assert_eq!(shadow_level(50), 128);
        assert_eq!(shadow_level(100), 255);
        assert_eq!(shadow_level(1), 3);
    }

    #[test]
    fn test_stencil_at_full_opacity_equals_product_alpha() {
        for alpha in 0..=255u8 {
            assert_eq!(stencil_alpha(alpha, 255), alpha);
            assert_eq!(stencil_alpha(alpha, 0), 0);
        }
    }

    #[test]
    fn test_full_opacity_shadow_copies_product_alpha() {
        let cutout = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 77]));
        let result = ShadowSynthesizer::synthesize_rgba(&cutout, &params(100, 0.0, 50, 0)).unwrap();

        assert_eq!(result.dimensions(), (60, 10));
        assert_eq!(result.product_origin, (0, 0));
        // Shadow-only pixel carries the matte's alpha unchanged
        assert_eq!(*result.image.get_pixel(55, 5), Rgba([0, 0, 0, 77]));
        assert_eq!(result.image.get_pixel(30, 5)[3], 0);
    }

    #[test]
    fn test_blur_extent() {
        assert_eq!(blur_extent(0.0), 0);
        assert_eq!(blur_extent(0.5), 2);
        assert_eq!(blur_extent(20.0), 60);
        assert_eq!(blur_extent(f32::NAN), 0);
    }

    #[test]
    fn test_zero_opacity_returns_cropped_product() {
        let mut cutout = RgbaImage::new(30, 20);
        for y in 5..15 {
            for x in 10..25 {
                cutout.put_pixel(x, y, Rgba([10, 200, 30, 255]));
            }
        }

        let result = ShadowSynthesizer::synthesize_rgba(&cutout, &params(0, 20.0, 30, 60)).unwrap();
        assert_eq!(result.dimensions(), (15, 10));
        assert_eq!(result.product_origin, (-10, -5));
        assert!(result.image.pixels().all(|p| *p == Rgba([10, 200, 30, 255])));
    }

    #[test]
    fn test_hard_shadow_is_offset_silhouette() {
        let cutout = opaque_block(40, 30);
        let result = ShadowSynthesizer::synthesize_rgba(&cutout, &params(100, 0.0, 12, 25)).unwrap();

        // Bounding box covers product plus offset shadow
        assert_eq!(result.dimensions(), (52, 55));
        assert_eq!(result.product_origin, (0, 0));

        let image = &result.image;
        // Product pixels untouched
        assert_eq!(*image.get_pixel(0, 0), Rgba([200, 40, 40, 255]));
        assert_eq!(*image.get_pixel(39, 29), Rgba([200, 40, 40, 255]));
        // Shadow-only region is opaque black
        assert_eq!(*image.get_pixel(51, 54), Rgba([0, 0, 0, 255]));
        assert_eq!(*image.get_pixel(12, 30), Rgba([0, 0, 0, 255]));
        // Outside both rectangles is transparent
        assert_eq!(image.get_pixel(45, 5)[3], 0);
        assert_eq!(image.get_pixel(5, 40)[3], 0);
        assert_eq!(image.get_pixel(11, 54)[3], 0);
    }

    #[test]
    fn test_negative_offset_moves_product_origin() {
        let cutout = opaque_block(10, 10);
        let result = ShadowSynthesizer::synthesize_rgba(&cutout, &params(60, 0.0, -20, -5)).unwrap();
        assert_eq!(result.dimensions(), (30, 15));
        assert_eq!(result.product_origin, (20, 5));
        assert_eq!(*result.image.get_pixel(0, 0), Rgba([0, 0, 0, 153]));
    }

    #[test]
    fn test_large_offset_with_blur_is_not_clipped() {
        let cutout = opaque_block(20, 20);
        let result = ShadowSynthesizer::synthesize_rgba(&cutout, &params(100, 10.0, 0, 100)).unwrap();
        let (width, height) = result.dimensions();

        // Shadow tail extends past the offset rectangle on every side it was blurred
        assert!(height > 120);
        assert!(width > 20);
        let bottom_row = height - 1;
        assert!((0..width).any(|x| result.image.get_pixel(x, bottom_row)[3] > 0));
    }

    #[test]
    fn test_blur_softens_shadow_edges() {
        let cutout = opaque_block(30, 30);
        let result = ShadowSynthesizer::synthesize_rgba(&cutout, &params(100, 4.0, 0, 40)).unwrap();
        let image = &result.image;
        let (ox, oy) = result.product_origin;
        let column = (ox + 15) as u32;

        // Inside the shadow rectangle, well away from its edges: nearly opaque
        let inner = image.get_pixel(column, (oy + 55) as u32)[3];
        assert!(inner > 250, "inner alpha {}", inner);
        // Just below the shadow's bottom edge: partially transparent
        let tail = image.get_pixel(column, (oy + 72) as u32)[3];
        assert!(tail > 0 && tail < 128, "tail alpha {}", tail);
    }

    #[test]
    fn test_rgb_input_is_promoted() {
        let rgb = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3])));
        let result = ShadowSynthesizer::synthesize(&rgb, &params(0, 0.0, 0, 0)).unwrap();
        assert_eq!(result.dimensions(), (8, 8));
        assert!(result.image.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
    }

    #[test]
    fn test_empty_matte_is_rejected() {
        let transparent = RgbaImage::new(16, 16);
        let err = ShadowSynthesizer::synthesize_rgba(&transparent, &ShadowParams::default()).unwrap_err();
        assert!(matches!(err, StudioError::InvalidInput(_)));

        let empty = RgbaImage::new(0, 0);
        assert!(matches!(
            ShadowSynthesizer::synthesize_rgba(&empty, &ShadowParams::default()),
            Err(StudioError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let cutout = opaque_block(4, 4);
        let bad = ShadowParams {
            opacity: 120,
            ..ShadowParams::default()
        };
        assert!(ShadowSynthesizer::synthesize_rgba(&cutout, &bad).is_err());
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let mut cutout = opaque_block(25, 18);
        cutout.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        cutout.put_pixel(3, 7, Rgba([90, 90, 90, 77]));
        let shadow = ShadowParams::default();

        let first = ShadowSynthesizer::synthesize_rgba(&cutout, &shadow).unwrap();
        let second = ShadowSynthesizer::synthesize_rgba(&cutout, &shadow).unwrap();
        assert_eq!(first.image.as_raw(), second.image.as_raw());
        assert_eq!(first.product_origin, second.product_origin);
    }
}
