//! Thumbnail image normalization.
//!
//! Raw captures are decoded, scaled down (never up) to fit the target box,
//! and re-encoded as JPEG. When any step fails the original bytes are kept
//! with the target box as nominal dimensions.

// ============================================================================
// Imports
// ============================================================================

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use tracing::warn;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default maximum thumbnail width.
pub const DEFAULT_TARGET_WIDTH: u32 = 800;

/// Default maximum thumbnail height.
pub const DEFAULT_TARGET_HEIGHT: u32 = 500;

/// Default JPEG quality of normalized thumbnails.
pub const DEFAULT_QUALITY: u8 = 60;

const JPEG_MIME: &str = "image/jpeg";

// ============================================================================
// NormalizeOptions
// ============================================================================

/// Target box and quality for normalized thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Maximum width in pixels.
    pub target_width: u32,
    /// Maximum height in pixels.
    pub target_height: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalizeOptions {
    /// Creates options with the default 800x500 box at quality 60.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            quality: DEFAULT_QUALITY,
        }
    }

    /// Sets the target box.
    #[inline]
    #[must_use]
    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    /// Sets the JPEG quality.
    #[inline]
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty box or a quality outside 1-100.
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(Error::config("normalization target must be non-empty"));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(Error::config(format!(
                "normalization quality must be 1-100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

// ============================================================================
// NormalizedImage
// ============================================================================

/// Output of normalization, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    /// Encoded image.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Device pixel ratio, always 1 after normalization.
    pub dpr: f32,
}

// ============================================================================
// Normalization
// ============================================================================

/// Computes the scaled size that fits `(target_width, target_height)`.
///
/// Aspect ratio is preserved, images are never enlarged, and both sides are
/// at least 1.
#[must_use]
pub fn target_dimensions(
    width: u32,
    height: u32,
    target_width: u32,
    target_height: u32,
) -> (u32, u32) {
    let width = f64::from(width.max(1));
    let height = f64::from(height.max(1));
    let ratio = (f64::from(target_width) / width)
        .min(f64::from(target_height) / height)
        .min(1.0);

    (
        ((width * ratio).round() as u32).max(1),
        ((height * ratio).round() as u32).max(1),
    )
}

/// Decodes, downscales, and re-encodes a capture as JPEG.
///
/// # Errors
///
/// Returns [`Error::Image`] if the bytes cannot be decoded or encoded.
pub fn normalize(bytes: &[u8], options: &NormalizeOptions) -> Result<NormalizedImage> {
    let img = image::load_from_memory(bytes)?;
    let (src_width, src_height) = img.dimensions();
    let (width, height) = target_dimensions(
        src_width,
        src_height,
        options.target_width,
        options.target_height,
    );

    let scaled = if (width, height) == (src_width, src_height) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
    };
    let rgb = scaled.to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, options.quality).encode_image(&rgb)?;

    Ok(NormalizedImage {
        bytes: jpeg,
        mime_type: JPEG_MIME.to_string(),
        width,
        height,
        dpr: 1.0,
    })
}

/// Normalizes a capture, keeping the original bytes if that fails.
///
/// `fallback_mime` is used when the original format cannot be sniffed.
pub(crate) fn normalize_or_original(
    bytes: Vec<u8>,
    fallback_mime: &str,
    options: &NormalizeOptions,
) -> NormalizedImage {
    match normalize(&bytes, options) {
        Ok(normalized) => normalized,
        Err(e) => {
            warn!(error = %e, len = bytes.len(), "Normalization failed, storing original bytes");
            let mime_type = image::guess_format(&bytes)
                .map(|format| format.to_mime_type().to_string())
                .unwrap_or_else(|_| fallback_mime.to_string());

            NormalizedImage {
                bytes,
                mime_type,
                width: options.target_width,
                height: options.target_height,
                dpr: 1.0,
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
