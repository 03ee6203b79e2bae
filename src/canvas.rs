//! Canvas fitting for fixed output aspect ratios
//!
//! The product gets a fixed 20% padding on each axis, then the canvas grows
//! along one axis until it matches the requested ratio. All arithmetic is
//! integral so the layout is exact and reproducible.

use crate::{
    config::AspectRatio,
    error::{Result, StudioError},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Padded content size is `product * CONTENT_SCALE.0 / CONTENT_SCALE.1`
const CONTENT_SCALE: (u64, u64) = (6, 5);

/// Canvas dimensions and where the product goes on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasLayout {
    pub width: u32,
    pub height: u32,
    pub paste_x: u32,
    pub paste_y: u32,
}

impl CanvasLayout {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StudioError::invalid_input(format!("canvas {} overflows: {}", what, value)))
}

/// Compute the canvas for a product of the given size at the given ratio
///
/// The canvas always contains the padded product box, and its dimensions
/// satisfy `|width * rh - height * rw| <= rh` for the ratio `rw:rh`.
///
/// # Errors
/// - `InvalidInput` when either product dimension is zero
/// - `InvalidInput` when the canvas would not fit in `u32`
pub fn fit_canvas(product_size: (u32, u32), aspect_ratio: AspectRatio) -> Result<CanvasLayout> {
    let (product_width, product_height) = product_size;
    if product_width == 0 || product_height == 0 {
        return Err(StudioError::invalid_input(format!(
            "cannot fit a zero-sized product ({}x{})",
            product_width, product_height
        )));
    }

    let (rw, rh) = aspect_ratio.ratio();
    let (rw, rh) = (u64::from(rw), u64::from(rh));
    let content_width = u64::from(product_width) * CONTENT_SCALE.0 / CONTENT_SCALE.1;
    let content_height = u64::from(product_height) * CONTENT_SCALE.0 / CONTENT_SCALE.1;

    let (width, height) = if content_width * rh > content_height * rw {
        // Wider than the target: width fixed, height derived (rounded up),
        // then width re-derived so the pair stays within one step of the ratio
        let height = (content_width * rh).div_ceil(rw);
        (height * rw / rh, height)
    } else {
        (content_height * rw / rh, content_height)
    };

    let layout = CanvasLayout {
        width: to_u32(width, "width")?,
        height: to_u32(height, "height")?,
        paste_x: to_u32((width - u64::from(product_width)) / 2, "paste x")?,
        paste_y: to_u32((height - u64::from(product_height)) / 2, "paste y")?,
    };

    debug!(
        product_width,
        product_height,
        aspect_ratio = %aspect_ratio,
        canvas_width = layout.width,
        canvas_height = layout.height,
        paste_x = layout.paste_x,
        paste_y = layout.paste_y,
        "Fitted canvas"
    );

    Ok(layout)
}
