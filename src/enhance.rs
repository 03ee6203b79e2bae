//! Brightness adjustment for cutouts

use image::{Rgba, RgbaImage};

/// Multiply every color channel by `factor`, clamping to the `u8` range
///
/// Alpha is left untouched, so the matte survives unchanged. A factor of
/// exactly `1.0` returns an identical copy.
#[must_use]
pub fn adjust_brightness(image: &RgbaImage, factor: f32) -> RgbaImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return image.clone();
    }

    let factor = if factor.is_finite() { factor.max(0.0) } else { 1.0 };
    let scale = |channel: u8| (f32::from(channel) * factor).round().clamp(0.0, 255.0) as u8;

    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        *pixel = Rgba([scale(r), scale(g), scale(b), a]);
    }
    output
}
