use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use std::io::Cursor;

/// Knobs for the quality descent. The step granularity affects which exact
/// quality the search lands on, so changing it changes output bytes; the
/// defaults mirror the service's historical tuning.
#[derive(Debug, Clone)]
pub struct EncodePolicy {
    pub max_bytes: usize,
    pub start_quality: u8,
    pub floor_quality: u8,
    pub quality_step: u8,
}

impl Default for EncodePolicy {
    fn default() -> Self {
        Self {
            max_bytes: 300 * 1024,
            start_quality: 95,
            floor_quality: 10,
            quality_step: 5,
        }
    }
}

/// JPEG bytes plus the quality they were produced at and whether the byte
/// ceiling was met.
#[derive(Debug)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub quality: u8,
    pub within_budget: bool,
}

/// Monotonic quality descent: encode, accept the first buffer at or under the
/// ceiling, otherwise step the quality down and retry. Once the next step
/// would cross the floor the floor-quality buffer is returned as a best
/// effort; missing the budget is not an error.
pub fn encode_size_bounded(image: &image::RgbaImage, policy: &EncodePolicy) -> Result<EncodedImage> {
    // JPEG has no alpha channel.
    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let step = policy.quality_step.max(1);
    let floor = policy.floor_quality.max(1);
    let mut quality = policy.start_quality.max(floor);

    loop {
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality);
        rgb.write_with_encoder(encoder)
            .with_context(|| format!("failed to encode JPEG at quality {}", quality))?;
        if bytes.len() <= policy.max_bytes {
            return Ok(EncodedImage {
                bytes,
                quality,
                within_budget: true,
            });
        }
        if quality <= floor {
            return Ok(EncodedImage {
                bytes,
                quality,
                within_budget: false,
            });
        }
        quality = quality.saturating_sub(step).max(floor);
    }
}
