//! Alpha channel helpers: coverage bounds and Porter-Duff "over"

use image::{Rgb, Rgba, RgbaImage};

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Tight bounding box of all pixels with non-zero alpha
///
/// Returns `None` for a fully transparent (or empty) image.
#[must_use]
pub fn alpha_bounding_box(image: &RgbaImage) -> Option<PixelBounds> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > 0 {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    found.then(|| PixelBounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Composite `src` over `dst`, both with straight (non-premultiplied) alpha
#[must_use]
pub fn blend_over_rgba(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    match src[3] {
        0 => return dst,
        255 => return src,
        _ => {},
    }

    let src_a = f32::from(src[3]) / 255.0;
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    let channel = |s: u8, d: u8| {
        to_u8((f32::from(s) * src_a + f32::from(d) * dst_a * (1.0 - src_a)) / out_a)
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        to_u8(out_a * 255.0),
    ])
}

/// Composite `src` over an opaque `dst`: `src * a + dst * (1 - a)` per channel
#[must_use]
pub fn blend_over_rgb(dst: Rgb<u8>, src: Rgba<u8>) -> Rgb<u8> {
    match src[3] {
        0 => return dst,
        255 => return Rgb([src[0], src[1], src[2]]),
        _ => {},
    }

    let alpha = f32::from(src[3]) / 255.0;
    let channel = |s: u8, d: u8| to_u8(f32::from(s) * alpha + f32::from(d) * (1.0 - alpha));

    Rgb([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
    ])
}
