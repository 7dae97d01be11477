// src/encode.rs
//! Downsizes a captured frame and turns it into a base64 PNG payload.

use base64::{engine::general_purpose, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use log::{debug, info};
use std::io::Cursor;
use thiserror::Error;

use crate::capture::{CapturedFrame, FramePixels};

/// Longest edge the encoder lets through by default
pub const DEFAULT_MAX_DIMENSION: u32 = 800;

pub const PNG_MIME_TYPE: &str = "image/png";

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("frame has no pixels")]
    Empty,
    #[error("raw buffer holds {actual} bytes, {width}x{height} needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("unreadable image data: {0}")]
    Corrupt(#[from] image::ImageError),
    #[error("PNG serialization failed: {0}")]
    Serialize(String),
}

/// Text-safe form of a downsized frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageEncoder {
    max_dimension: u32,
}

impl Default for ImageEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

impl ImageEncoder {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Decode, shrink to fit, drop alpha, re-serialize as PNG and base64 it
    pub fn encode(&self, frame: &CapturedFrame) -> Result<EncodedImage, EncodingError> {
        let image = decode_frame(frame)?;
        let (src_w, src_h) = (image.width(), image.height());
        if src_w == 0 || src_h == 0 {
            return Err(EncodingError::Empty);
        }

        let (width, height) = fit_within(src_w, src_h, self.max_dimension);
        let image = if (width, height) != (src_w, src_h) {
            debug!("Resizing {}x{} -> {}x{}", src_w, src_h, width, height);
            image.resize_exact(width, height, FilterType::Lanczos3)
        } else {
            image
        };

        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());

        let mut buffer = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Png)
            .map_err(|e| EncodingError::Serialize(e.to_string()))?;

        info!(
            "Encoded frame {}x{} -> {}x{} PNG ({} bytes)",
            src_w,
            src_h,
            width,
            height,
            buffer.len()
        );

        Ok(EncodedImage {
            data: general_purpose::STANDARD.encode(&buffer),
            mime_type: PNG_MIME_TYPE,
            width,
            height,
        })
    }
}

/// Turn whatever the source delivered into a decoded image
pub fn decode_frame(frame: &CapturedFrame) -> Result<DynamicImage, EncodingError> {
    match &frame.pixels {
        FramePixels::Rgba8 { width, height, data } => {
            rgba_from_raw(*width, *height, data.clone()).map(DynamicImage::ImageRgba8)
        }
        FramePixels::Bgra8 { width, height, data } => {
            if data.len() % 4 != 0 {
                return Err(buffer_size_error(*width, *height, data.len()));
            }
            let mut rgba = Vec::with_capacity(data.len());
            for chunk in data.chunks_exact(4) {
                rgba.extend_from_slice(&[chunk[2], chunk[1], chunk[0], chunk[3]]);
            }
            rgba_from_raw(*width, *height, rgba).map(DynamicImage::ImageRgba8)
        }
        FramePixels::Encoded(bytes) => {
            if bytes.is_empty() {
                return Err(EncodingError::Empty);
            }
            Ok(image::load_from_memory(bytes)?)
        }
    }
}

fn rgba_from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<RgbaImage, EncodingError> {
    if width == 0 || height == 0 {
        return Err(EncodingError::Empty);
    }
    let actual = data.len();
    RgbaImage::from_raw(width, height, data).ok_or_else(|| buffer_size_error(width, height, actual))
}

fn buffer_size_error(width: u32, height: u32, actual: usize) -> EncodingError {
    EncodingError::BufferSize {
        width,
        height,
        expected: width as usize * height as usize * 4,
        actual,
    }
}

/// Largest size within `bound` x `bound` with the same aspect ratio; never upscales
pub fn fit_within(width: u32, height: u32, bound: u32) -> (u32, u32) {
    if width <= bound && height <= bound {
        return (width, height);
    }
    let scale = bound as f64 / width.max(height) as f64;
    let w = ((width as f64 * scale).round() as u32).clamp(1, bound);
    let h = ((height as f64 * scale).round() as u32).clamp(1, bound);
    (w, h)
}
