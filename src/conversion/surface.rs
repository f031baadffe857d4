//! Encoder surface: decode one image, draw it onto the shared canvas and
//! encode the canvas to the target format.

use crate::state::EncodedArtifact;
use async_trait::async_trait;
use bytes::Bytes;
use image::{ExtendedColorType, ImageEncoder};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use webpforge_common::{Error, Quality, Result, TargetFormat};

/// A decode/encode resource that can only serve one item at a time.
#[async_trait]
pub trait EncoderSurface: Send + Sync {
    /// Format every artifact from this surface is encoded in.
    fn format(&self) -> TargetFormat;

    /// Decode `source` and re-encode it at `quality`.
    async fn encode(&self, source: Bytes, quality: Quality) -> Result<EncodedArtifact>;
}

/// Shared RGBA raster reused across conversions.
#[derive(Default)]
struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn draw(&mut self, image: image::RgbaImage) {
        self.width = image.width();
        self.height = image.height();
        self.pixels.clear();
        self.pixels.extend_from_slice(image.as_raw());
    }
}

/// [`EncoderSurface`] backed by the `image` decoders and libwebp.
pub struct ImageSurface {
    format: TargetFormat,
    canvas: Arc<Mutex<Canvas>>,
}

impl ImageSurface {
    pub fn new(format: TargetFormat) -> Self {
        Self {
            format,
            canvas: Arc::new(Mutex::new(Canvas::default())),
        }
    }
}

impl Default for ImageSurface {
    fn default() -> Self {
        Self::new(TargetFormat::default())
    }
}

#[async_trait]
impl EncoderSurface for ImageSurface {
    fn format(&self) -> TargetFormat {
        self.format
    }

    async fn encode(&self, source: Bytes, quality: Quality) -> Result<EncodedArtifact> {
        let quality = Quality::new(quality.value());
        let format = self.format;

        let decoded = tokio::task::spawn_blocking(move || decode(&source))
            .await
            .map_err(|e| Error::internal(format!("decode task failed: {e}")))??;

        let canvas = Arc::clone(&self.canvas);
        let bytes = tokio::task::spawn_blocking(move || {
            let mut guard = canvas
                .try_lock()
                .ok_or_else(|| Error::internal("encoder surface is already in use"))?;
            guard.draw(decoded);
            encode_canvas(&guard, format, quality)
        })
        .await
        .map_err(|e| Error::internal(format!("encode task failed: {e}")))??;

        if bytes.is_empty() {
            return Err(Error::EmptyOutput);
        }

        debug!("Encoded {} bytes of {} at {}", bytes.len(), format, quality);
        Ok(EncodedArtifact {
            bytes: Bytes::from(bytes),
            quality,
            format,
        })
    }
}

fn decode(source: &[u8]) -> Result<image::RgbaImage> {
    let image = image::load_from_memory(source).map_err(|e| Error::decode(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::decode("image has no pixels"));
    }
    Ok(image.to_rgba8())
}

fn encode_canvas(canvas: &Canvas, format: TargetFormat, quality: Quality) -> Result<Vec<u8>> {
    match format {
        TargetFormat::WebP => {
            let encoder = webp::Encoder::from_rgba(&canvas.pixels, canvas.width, canvas.height);
            let memory = encoder
                .encode_simple(false, quality.value() * 100.0)
                .map_err(|e| Error::encode(format!("{e:?}")))?;
            Ok(memory.to_vec())
        }
        TargetFormat::Jpeg => {
            let rgba = image::RgbaImage::from_raw(canvas.width, canvas.height, canvas.pixels.clone())
                .ok_or_else(|| Error::encode("canvas size does not match its pixels"))?;
            let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

            let mut out = Vec::new();
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.percent())
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(|e| Error::encode(e.to_string()))?;
            Ok(out)
        }
    }
}
