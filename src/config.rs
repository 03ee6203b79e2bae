//! Configuration and parameter types for product compositing

use crate::error::{Result, StudioError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Valid shadow opacity range in percent
pub const OPACITY_RANGE: (u8, u8) = (0, 100);
/// Valid blur radius range in pixels
pub const BLUR_RADIUS_RANGE: (f32, f32) = (0.0, 50.0);
/// Valid horizontal shadow offset range in pixels
pub const X_OFFSET_RANGE: (i32, i32) = (-50, 50);
/// Valid vertical shadow offset range in pixels
pub const Y_OFFSET_RANGE: (i32, i32) = (-50, 100);
/// Valid brightness factor range
pub const BRIGHTNESS_RANGE: (f32, f32) = (0.0, 4.0);

/// Drop shadow parameters
///
/// All four fields are independent. Ranges are checked by [`ShadowParams::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowParams {
    /// Shadow opacity in percent (0-100)
    pub opacity: u8,
    /// Gaussian blur standard deviation in pixels (0-50)
    pub blur_radius: f32,
    /// Horizontal offset in pixels, positive moves right (-50..=50)
    pub x_offset: i32,
    /// Vertical offset in pixels, positive moves down (-50..=100)
    pub y_offset: i32,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            opacity: 60,
            blur_radius: 20.0,
            x_offset: 0,
            y_offset: 30,
        }
    }
}

impl ShadowParams {
    /// Create validated shadow parameters
    ///
    /// # Errors
    /// - Any field outside its documented range
    pub fn new(opacity: u8, blur_radius: f32, x_offset: i32, y_offset: i32) -> Result<Self> {
        let params = Self {
            opacity,
            blur_radius,
            x_offset,
            y_offset,
        };
        params.validate()?;
        Ok(params)
    }

    /// Parameters that produce no visible shadow
    #[must_use]
    pub fn none() -> Self {
        Self {
            opacity: 0,
            blur_radius: 0.0,
            x_offset: 0,
            y_offset: 0,
        }
    }

    /// Check every field against its range
    ///
    /// # Errors
    /// - `InvalidInput` naming the first offending field
    pub fn validate(&self) -> Result<()> {
        if self.opacity > OPACITY_RANGE.1 {
            return Err(StudioError::parameter_out_of_range(
                "shadow opacity",
                self.opacity,
                "0-100",
            ));
        }
        if !(BLUR_RADIUS_RANGE.0..=BLUR_RADIUS_RANGE.1).contains(&self.blur_radius) {
            return Err(StudioError::parameter_out_of_range(
                "shadow blur radius",
                self.blur_radius,
                "0-50",
            ));
        }
        if !(X_OFFSET_RANGE.0..=X_OFFSET_RANGE.1).contains(&self.x_offset) {
            return Err(StudioError::parameter_out_of_range(
                "shadow x offset",
                self.x_offset,
                "-50-50",
            ));
        }
        if !(Y_OFFSET_RANGE.0..=Y_OFFSET_RANGE.1).contains(&self.y_offset) {
            return Err(StudioError::parameter_out_of_range(
                "shadow y offset",
                self.y_offset,
                "-50-100",
            ));
        }
        Ok(())
    }
}

/// Supported output aspect ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "21:9")]
    Ultrawide21x9,
}

impl AspectRatio {
    /// Every supported ratio, in menu order
    pub const ALL: [AspectRatio; 10] = [
        Self::Square,
        Self::Portrait9x16,
        Self::Landscape16x9,
        Self::Portrait3x4,
        Self::Landscape4x3,
        Self::Landscape3x2,
        Self::Portrait2x3,
        Self::Landscape5x4,
        Self::Portrait4x5,
        Self::Ultrawide21x9,
    ];

    /// `(width, height)` ratio terms
    #[must_use]
    pub fn ratio(self) -> (u32, u32) {
        match self {
            Self::Square => (1, 1),
            Self::Portrait9x16 => (9, 16),
            Self::Landscape16x9 => (16, 9),
            Self::Portrait3x4 => (3, 4),
            Self::Landscape4x3 => (4, 3),
            Self::Landscape3x2 => (3, 2),
            Self::Portrait2x3 => (2, 3),
            Self::Landscape5x4 => (5, 4),
            Self::Portrait4x5 => (4, 5),
            Self::Ultrawide21x9 => (21, 9),
        }
    }

    /// Tag as shown to users, e.g. `"16:9"`
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait9x16 => "9:16",
            Self::Landscape16x9 => "16:9",
            Self::Portrait3x4 => "3:4",
            Self::Landscape4x3 => "4:3",
            Self::Landscape3x2 => "3:2",
            Self::Portrait2x3 => "2:3",
            Self::Landscape5x4 => "5:4",
            Self::Portrait4x5 => "4:5",
            Self::Ultrawide21x9 => "21:9",
        }
    }

    /// Look up a tag, falling back to 1:1 for anything unknown
    ///
    /// The fallback is the documented default, not an error. Use
    /// [`str::parse`] when unknown tags must be rejected.
    #[must_use]
    pub fn from_tag_or_default(tag: &str) -> Self {
        tag.parse().unwrap_or_else(|_| {
            log::warn!("Unknown aspect ratio '{}', falling back to 1:1", tag);
            Self::default()
        })
    }
}

impl FromStr for AspectRatio {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|ratio| ratio.tag() == trimmed)
            .ok_or_else(|| {
                StudioError::invalid_input(format!(
                    "unsupported aspect ratio '{}' (supported: {})",
                    s,
                    Self::ALL.map(AspectRatio::tag).join(", ")
                ))
            })
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Opaque RGB color used for flat backgrounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbColor {
    pub const WHITE: RgbColor = RgbColor::new(255, 255, 255);
    pub const BLACK: RgbColor = RgbColor::new(0, 0, 0);

    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parse `#RRGGBB`, `RRGGBB`, `#RGB` or `RGB`
    ///
    /// # Errors
    /// - Wrong length or non-hex digits
    pub fn parse_hex(value: &str) -> Result<Self> {
        let digits = value.trim().trim_start_matches('#');
        let invalid = || StudioError::invalid_input(format!("invalid color '{}'", value));

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match digits.len() {
            6 => Ok(Self::new(
                channel(digits.get(0..2).ok_or_else(invalid)?)?,
                channel(digits.get(2..4).ok_or_else(invalid)?)?,
                channel(digits.get(4..6).ok_or_else(invalid)?)?,
            )),
            3 => {
                // #abc expands to #aabbcc
                let expand = |i: usize| -> Result<u8> {
                    let c = digits.get(i..=i).ok_or_else(invalid)?;
                    Ok(channel(c)? * 17)
                };
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?))
            },
            _ => Err(invalid()),
        }
    }

    #[must_use]
    pub fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.red, self.green, self.blue])
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for RgbColor {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_hex(s)
    }
}

impl TryFrom<String> for RgbColor {
    type Error = StudioError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse_hex(&value)
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_string()
    }
}

impl std::fmt::Display for RgbColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

/// What to put behind the product
#[derive(Debug, Clone)]
pub enum BackgroundSpec {
    /// Flat opaque color
    Color(RgbColor),
    /// Caller-supplied image, resized to the canvas
    Image(Arc<DynamicImage>),
    /// Image produced by the background generator from a text prompt
    Generated { prompt: String },
}

impl Default for BackgroundSpec {
    fn default() -> Self {
        Self::Color(RgbColor::WHITE)
    }
}

impl PartialEq for BackgroundSpec {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Color(a), Self::Color(b)) => a == b,
            (Self::Image(a), Self::Image(b)) => Arc::ptr_eq(a, b),
            (Self::Generated { prompt: a }, Self::Generated { prompt: b }) => a == b,
            _ => false,
        }
    }
}

/// Target canvas: aspect ratio plus background
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanvasRequest {
    pub aspect_ratio: AspectRatio,
    pub background: BackgroundSpec,
}

impl CanvasRequest {
    #[must_use]
    pub fn new(aspect_ratio: AspectRatio, background: BackgroundSpec) -> Self {
        Self {
            aspect_ratio,
            background,
        }
    }

    /// Flat color background
    #[must_use]
    pub fn solid(aspect_ratio: AspectRatio, color: RgbColor) -> Self {
        Self::new(aspect_ratio, BackgroundSpec::Color(color))
    }

    /// Generated background from a prompt
    pub fn generated<S: Into<String>>(aspect_ratio: AspectRatio, prompt: S) -> Self {
        Self::new(
            aspect_ratio,
            BackgroundSpec::Generated {
                prompt: prompt.into(),
            },
        )
    }

    /// Caller-supplied background image
    #[must_use]
    pub fn with_image(aspect_ratio: AspectRatio, image: DynamicImage) -> Self {
        Self::new(aspect_ratio, BackgroundSpec::Image(Arc::new(image)))
    }
}

/// Studio-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Brightness factor applied to the cutout (1.0 = unchanged)
    pub brightness: f32,

    /// Timeout for the background removal call
    #[serde(with = "duration_secs")]
    pub removal_timeout: Duration,

    /// Timeout for the background generation call
    #[serde(with = "duration_secs")]
    pub generation_timeout: Duration,

    /// Shadow used when the caller does not override it
    pub default_shadow: ShadowParams,

    /// Aspect ratio used when the caller does not override it
    pub default_aspect_ratio: AspectRatio,

    /// Background color used when the caller does not override it
    pub default_background_color: RgbColor,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            brightness: 1.05,
            removal_timeout: Duration::from_secs(60),
            generation_timeout: Duration::from_secs(120),
            default_shadow: ShadowParams::default(),
            default_aspect_ratio: AspectRatio::default(),
            default_background_color: RgbColor::WHITE,
        }
    }
}

impl StudioConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use product_studio::StudioConfig;
    ///
    /// let config = StudioConfig::builder()
    ///     .brightness(1.0)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.brightness, 1.0);
    /// ```
    #[must_use]
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Brightness outside 0.0-4.0 or not finite
    /// - Zero timeouts
    /// - Invalid default shadow parameters
    pub fn validate(&self) -> Result<()> {
        if !self.brightness.is_finite()
            || !(BRIGHTNESS_RANGE.0..=BRIGHTNESS_RANGE.1).contains(&self.brightness)
        {
            return Err(StudioError::config_value_error(
                "brightness",
                self.brightness,
                "0.0-4.0",
                Some(1.05),
            ));
        }

        if self.removal_timeout.is_zero() {
            return Err(StudioError::invalid_config(
                "Background removal timeout must be greater than zero",
            ));
        }

        if self.generation_timeout.is_zero() {
            return Err(StudioError::invalid_config(
                "Background generation timeout must be greater than zero",
            ));
        }

        self.default_shadow
            .validate()
            .map_err(|e| StudioError::invalid_config(format!("default shadow: {}", e)))?;

        Ok(())
    }

    /// Load and validate a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    /// - File cannot be read
    /// - Invalid JSON
    /// - Validation failure
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| StudioError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    /// - Serialization failure
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Canvas request built from the configured defaults
    #[must_use]
    pub fn default_canvas_request(&self) -> CanvasRequest {
        CanvasRequest::solid(self.default_aspect_ratio, self.default_background_color)
    }
}

/// Builder for `StudioConfig`
#[derive(Debug, Default)]
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl StudioConfigBuilder {
    #[must_use]
    pub fn brightness(mut self, brightness: f32) -> Self {
        self.config.brightness = brightness;
        self
    }

    #[must_use]
    pub fn removal_timeout(mut self, timeout: Duration) -> Self {
        self.config.removal_timeout = timeout;
        self
    }

    #[must_use]
    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.generation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn default_shadow(mut self, shadow: ShadowParams) -> Self {
        self.config.default_shadow = shadow;
        self
    }

    #[must_use]
    pub fn default_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.config.default_aspect_ratio = ratio;
        self
    }

    #[must_use]
    pub fn default_background_color(mut self, color: RgbColor) -> Self {
        self.config.default_background_color = color;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any validation failure from [`StudioConfig::validate`]
    pub fn build(self) -> Result<StudioConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(crate) fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shadow_matches_ui_defaults() {
        let shadow = ShadowParams::default();
        assert_eq!(shadow.opacity, 60);
        assert_eq!(shadow.blur_radius, 20.0);
        assert_eq!(shadow.x_offset, 0);
        assert_eq!(shadow.y_offset, 30);
        assert!(shadow.validate().is_ok());
    }

    #[test]
    fn test_shadow_range_validation() {
        assert!(ShadowParams::new(0, 0.0, -50, -50).is_ok());
        assert!(ShadowParams::new(100, 50.0, 50, 100).is_ok());

        let err = ShadowParams::new(101, 0.0, 0, 0).unwrap_err();
        assert!(err.to_string().contains("opacity"));
        assert!(ShadowParams::new(50, -1.0, 0, 0).is_err());
        assert!(ShadowParams::new(50, 50.5, 0, 0).is_err());
        assert!(ShadowParams::new(50, f32::NAN, 0, 0).is_err());
        assert!(ShadowParams::new(50, 1.0, 51, 0).is_err());
        assert!(ShadowParams::new(50, 1.0, 0, 101).is_err());
        assert!(ShadowParams::new(50, 1.0, 0, -51).is_err());
    }

    #[test]
    fn test_aspect_ratio_table() {
        assert_eq!(AspectRatio::ALL.len(), 10);
        for ratio in AspectRatio::ALL {
            let parsed: AspectRatio = ratio.tag().parse().unwrap();
            assert_eq!(parsed, ratio);
            let (w, h) = ratio.ratio();
            assert_eq!(ratio.tag(), format!("{}:{}", w, h));
        }
        assert_eq!(AspectRatio::Ultrawide21x9.ratio(), (21, 9));
    }

    #[test]
    fn test_unknown_aspect_ratio_falls_back_to_square() {
        assert_eq!(AspectRatio::from_tag_or_default("7:3"), AspectRatio::Square);
        assert_eq!(AspectRatio::from_tag_or_default(""), AspectRatio::Square);
        assert_eq!(AspectRatio::from_tag_or_default("16:9"), AspectRatio::Landscape16x9);
        assert!("7:3".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_aspect_ratio_serde_uses_tags() {
        let json = serde_json::to_string(&AspectRatio::Portrait4x5).unwrap();
        assert_eq!(json, "\"4:5\"");
        let parsed: AspectRatio = serde_json::from_str("\"21:9\"").unwrap();
        assert_eq!(parsed, AspectRatio::Ultrawide21x9);
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!(RgbColor::parse_hex("#FFFFFF").unwrap(), RgbColor::WHITE);
        assert_eq!(RgbColor::parse_hex("ff8000").unwrap(), RgbColor::new(255, 128, 0));
        assert_eq!(RgbColor::parse_hex("#0f0").unwrap(), RgbColor::new(0, 255, 0));
        assert!(RgbColor::parse_hex("#12345").is_err());
        assert!(RgbColor::parse_hex("#GGGGGG").is_err());
        assert!(RgbColor::parse_hex("").is_err());
        assert_eq!(RgbColor::new(1, 2, 255).to_string(), "#0102FF");
    }

    #[test]
    fn test_default_config() {
        let config = StudioConfig::default();
        assert_eq!(config.brightness, 1.05);
        assert_eq!(config.removal_timeout, Duration::from_secs(60));
        assert_eq!(config.generation_timeout, Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_validation() {
        let config = StudioConfig::builder()
            .brightness(1.5)
            .default_aspect_ratio(AspectRatio::Landscape16x9)
            .build()
            .unwrap();
        assert_eq!(config.brightness, 1.5);
        assert_eq!(config.default_aspect_ratio, AspectRatio::Landscape16x9);

        let result = StudioConfig::builder().brightness(9.0).build();
        assert!(result.unwrap_err().to_string().contains("brightness"));

        let result = StudioConfig::builder()
            .removal_timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());

        let bad_shadow = ShadowParams {
            opacity: 200,
            ..ShadowParams::default()
        };
        assert!(StudioConfig::builder().default_shadow(bad_shadow).build().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = StudioConfig::builder()
            .generation_timeout(Duration::from_millis(2500))
            .default_background_color(RgbColor::new(10, 20, 30))
            .build()
            .unwrap();
        let json = config.to_json().unwrap();
        assert!(json.contains("\"#0A141E\""));
        assert!(json.contains("2.5"));

        let parsed: StudioConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_from_partial_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.json");
        std::fs::write(&path, r#"{ "brightness": 1.0, "default_aspect_ratio": "9:16" }"#).unwrap();

        let config = StudioConfig::from_json_file(&path).unwrap();
        assert_eq!(config.brightness, 1.0);
        assert_eq!(config.default_aspect_ratio, AspectRatio::Portrait9x16);
        assert_eq!(config.removal_timeout, Duration::from_secs(60));

        std::fs::write(&path, r#"{ "brightness": -3.0 }"#).unwrap();
        assert!(StudioConfig::from_json_file(&path).is_err());

        assert!(StudioConfig::from_json_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_canvas_request_constructors() {
        let request = CanvasRequest::generated(AspectRatio::Landscape3x2, "marble table");
        assert_eq!(
            request.background,
            BackgroundSpec::Generated {
                prompt: "marble table".to_string()
            }
        );

        let request = CanvasRequest::default();
        assert_eq!(request.aspect_ratio, AspectRatio::Square);
        assert_eq!(request.background, BackgroundSpec::Color(RgbColor::WHITE));
    }
}
