//! Decoded frames and encoding for transport.
//!
//! `RawFrame` is the unit handed from ingestion to the capture loop: RGB24
//! pixels plus dimensions and a capture sequence number. Encoding for the
//! detection endpoint downscales frames above a configured bound before
//! JPEG compression, trading resolution for transfer latency.

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

use crate::config::EncodeSettings;

/// One decoded RGB24 frame.
#[derive(Clone)]
pub struct RawFrame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic capture sequence within a source.
    pub seq: u64,
}

impl RawFrame {
    /// Create a frame. Called by ingestion; validates the pixel buffer
    /// length against the dimensions.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, seq: u64) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))? as usize;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            seq,
        })
    }

    /// Decode an encoded image (JPEG/PNG) into a frame.
    pub fn decode(bytes: &[u8], seq: u64) -> Result<Self> {
        let decoded = image::load_from_memory(bytes).context("decode image")?;
        let rgb = decoded.into_rgb8();
        let (width, height) = rgb.dimensions();
        Self::new(rgb.into_raw(), width, height, seq)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// View the frame as an owned `RgbImage` for overlay drawing.
    pub fn to_image(&self) -> RgbImage {
        // Length was validated at construction.
        RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Encode for transport. Frames whose larger dimension exceeds
    /// `encode.max_dim` are resized (aspect preserved) before compression.
    pub fn encode_jpeg(&self, encode: &EncodeSettings) -> Result<Vec<u8>> {
        let image = DynamicImage::ImageRgb8(self.to_image());
        let image = if self.width.max(self.height) > encode.max_dim {
            image.resize(encode.max_dim, encode.max_dim, FilterType::Triangle)
        } else {
            image
        };
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, encode.jpeg_quality)
            .encode_image(&image)
            .context("encode jpeg")?;
        Ok(out)
    }
}
