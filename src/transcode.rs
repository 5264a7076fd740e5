//! Image re-encoding for delivery
//!
//! Generated images are decoded, shrunk so the longer side fits a bound and
//! re-encoded as lossy JPEG. The primary setting is used for uploaded
//! objects; the fallback setting trades quality for size when the image has
//! to travel inline in the response.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

/// Quality of uploaded images
pub const PRIMARY_QUALITY: u8 = 85;
/// Longer-side bound of uploaded images
pub const PRIMARY_MAX_DIMENSION: u32 = 800;
/// Quality of inline fallback images
pub const FALLBACK_QUALITY: u8 = 70;
/// Longer-side bound of inline fallback images
pub const FALLBACK_MAX_DIMENSION: u32 = 600;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";
pub const JPEG_EXTENSION: &str = "jpg";

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Failed to decode generated image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Encoding parameters for one delivery path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    pub quality: u8,
    pub max_dimension: u32,
}

impl EncodeSettings {
    pub const PRIMARY: Self = Self {
        quality: PRIMARY_QUALITY,
        max_dimension: PRIMARY_MAX_DIMENSION,
    };

    pub const FALLBACK: Self = Self {
        quality: FALLBACK_QUALITY,
        max_dimension: FALLBACK_MAX_DIMENSION,
    };
}

/// Re-encoded image ready for storage or inlining
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// Self-contained `data:` URL carrying the encoded bytes
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }
}

/// Dimensions that fit `(width, height)` within `max_dimension`
///
/// Aspect ratio is kept and the computed short side is truncated. Images
/// already within the bound keep their size.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= max_dimension || longer == 0 {
        return (width, height);
    }

    let scale = |side: u32| -> u32 {
        let scaled = u64::from(side) * u64::from(max_dimension) / u64::from(longer);
        // A non-zero side never collapses to zero pixels
        u32::try_from(scaled).unwrap_or(max_dimension).max(1)
    };

    if width >= height {
        (max_dimension, scale(height))
    } else {
        (scale(width), max_dimension)
    }
}

/// Decode `raw`, resize it per `settings` and encode it as JPEG
pub fn compress(raw: &[u8], settings: EncodeSettings) -> Result<EncodedImage, TranscodeError> {
    let decoded = image::load_from_memory(raw).map_err(TranscodeError::Decode)?;

    let (width, height) = fit_within(decoded.width(), decoded.height(), settings.max_dimension);
    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Lanczos3)
    };

    // JPEG carries no alpha channel
    let rgb = resized.to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, settings.quality)
        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(TranscodeError::Encode)?;

    tracing::debug!(
        input_bytes = raw.len(),
        output_bytes = bytes.len(),
        width = width,
        height = height,
        quality = settings.quality,
        "Image re-encoded"
    );

    Ok(EncodedImage {
        bytes,
        mime_type: JPEG_MIME_TYPE,
        width,
        height,
    })
}
