//! Utility modules for common pixel operations
//!
//! Alpha-plane helpers shared by the shadow synthesizer and the background
//! compositor.

pub mod alpha;

// Re-export commonly used items for convenience
pub use alpha::{alpha_bounding_box, blend_over_rgb, blend_over_rgba, PixelBounds};
