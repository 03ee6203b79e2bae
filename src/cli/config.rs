//! Conversion of CLI arguments into studio settings

use crate::cli::main_impl::Cli;
use crate::config::{AspectRatio, BackgroundSpec, CanvasRequest, RgbColor, ShadowParams, StudioConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Everything one CLI run needs
#[derive(Debug, Clone)]
pub(crate) struct CliSettings {
    pub(crate) config: StudioConfig,
    pub(crate) shadow: ShadowParams,
    pub(crate) canvas: CanvasRequest,
}

/// Convert CLI arguments to studio settings
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Layer CLI flags over the config file (or the defaults)
    pub(crate) fn from_cli(cli: &Cli) -> Result<CliSettings> {
        let config = Self::studio_config(cli)?;
        let shadow = Self::shadow_params(cli, &config)?;
        let canvas = Self::canvas_request(cli, &config)?;
        Ok(CliSettings {
            config,
            shadow,
            canvas,
        })
    }

    fn studio_config(cli: &Cli) -> Result<StudioConfig> {
        let mut config = match &cli.config {
            Some(path) => StudioConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => StudioConfig::default(),
        };

        if let Some(brightness) = cli.brightness {
            config.brightness = brightness;
        }
        if let Some(seconds) = cli.timeout {
            config.removal_timeout = Duration::from_secs(seconds);
            config.generation_timeout = Duration::from_secs(seconds);
        }

        config.validate().context("Invalid studio configuration")?;
        Ok(config)
    }

    fn shadow_params(cli: &Cli, config: &StudioConfig) -> Result<ShadowParams> {
        let defaults = config.default_shadow;
        let shadow = ShadowParams {
            opacity: cli.opacity.unwrap_or(defaults.opacity),
            blur_radius: cli.blur.unwrap_or(defaults.blur_radius),
            x_offset: cli.x_offset.unwrap_or(defaults.x_offset),
            y_offset: cli.y_offset.unwrap_or(defaults.y_offset),
        };
        shadow.validate().context("Invalid shadow parameters")?;
        Ok(shadow)
    }

    fn canvas_request(cli: &Cli, config: &StudioConfig) -> Result<CanvasRequest> {
        let defaults = config.default_canvas_request();
        let aspect_ratio = cli
            .aspect_ratio
            .as_deref()
            .map_or(defaults.aspect_ratio, AspectRatio::from_tag_or_default);

        let background = if let Some(prompt) = &cli.bg_prompt {
            BackgroundSpec::Generated {
                prompt: prompt.clone(),
            }
        } else if let Some(path) = &cli.bg_image {
            let image = image::open(path)
                .with_context(|| format!("Failed to open background image {}", path.display()))?;
            BackgroundSpec::Image(Arc::new(image))
        } else if let Some(hex) = &cli.bg_color {
            BackgroundSpec::Color(RgbColor::parse_hex(hex).context("Invalid --bg-color")?)
        } else {
            defaults.background
        };

        Ok(CanvasRequest::new(aspect_ratio, background))
    }
}
