//! HTTP adapters for remote removal and generation services

use super::{BackgroundGenerator, BackgroundRemover};
use crate::error::{StudioError, UpstreamError};
use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::io::Cursor;
use std::time::Duration;

fn build_client(timeout: Duration) -> crate::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| StudioError::invalid_config(format!("Failed to create HTTP client: {}", e)))
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, UpstreamError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| UpstreamError::invalid_response(format!("could not encode request image: {}", e)))?;
    Ok(bytes)
}

fn decode_image(bytes: &[u8]) -> Result<RgbaImage, UpstreamError> {
    image::load_from_memory(bytes)
        .map(|image| image.to_rgba8())
        .map_err(|e| UpstreamError::invalid_response(format!("response is not an image: {}", e)))
}

/// Interpret a generation response body; empty means "no image"
fn decode_generated(status: StatusCode, bytes: &[u8]) -> Result<Option<RgbaImage>, UpstreamError> {
    if status == StatusCode::NO_CONTENT || bytes.is_empty() {
        return Ok(None);
    }
    decode_image(bytes).map(Some)
}

/// Background removal service reached over HTTP
///
/// The photo is POSTed as PNG; the response body must be an image of the same
/// size with the background made transparent.
#[derive(Debug, Clone)]
pub struct HttpBackgroundRemover {
    client: Client,
    endpoint: String,
}

impl HttpBackgroundRemover {
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new<S: Into<String>>(endpoint: S, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BackgroundRemover for HttpBackgroundRemover {
    async fn remove_background(&self, image: &RgbaImage) -> Result<RgbaImage, UpstreamError> {
        let body = encode_png(image)?;
        log::debug!("POST {} ({} bytes)", self.endpoint, body.len());

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        let cutout = decode_image(&bytes)?;

        if cutout.dimensions() != image.dimensions() {
            return Err(UpstreamError::invalid_response(format!(
                "cutout is {}x{}, expected {}x{}",
                cutout.width(),
                cutout.height(),
                image.width(),
                image.height()
            )));
        }
        Ok(cutout)
    }

    fn name(&self) -> &str {
        "http-remover"
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    width: u32,
    height: u32,
}

/// Background generation service reached over HTTP
///
/// Sends `{"prompt", "width", "height"}` as JSON. A `204 No Content` or an
/// empty body means the service produced nothing.
#[derive(Debug, Clone)]
pub struct HttpBackgroundGenerator {
    client: Client,
    endpoint: String,
}

impl HttpBackgroundGenerator {
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new<S: Into<String>>(endpoint: S, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BackgroundGenerator for HttpBackgroundGenerator {
    async fn generate(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> Result<Option<RgbaImage>, UpstreamError> {
        log::debug!("POST {} for {}x{} background", self.endpoint, width, height);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerationRequest {
                prompt,
                width,
                height,
            })
            .send()
            .await?
            .error_for_status()?;
        let status = response.status();
        let bytes = response.bytes().await?;
        decode_generated(status, &bytes)
    }

    fn name(&self) -> &str {
        "http-generator"
    }
}
