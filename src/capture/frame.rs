// src/capture/frame.rs
use chrono::{DateTime, Local};
use thiserror::Error;

/// Failure to acquire a frame from the active source
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no capture device available")]
    NoDevice,
    #[error("capture failed: {0}")]
    Device(String),
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Pixel payload of a captured frame, as delivered by the source
#[derive(Debug, Clone)]
pub enum FramePixels {
    Rgba8 { width: u32, height: u32, data: Vec<u8> },
    Bgra8 { width: u32, height: u32, data: Vec<u8> },
    /// A still-image file (PNG, JPEG, ...) that still has to be decoded
    Encoded(Vec<u8>),
}

/// One frame, owned by a single capture cycle
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub pixels: FramePixels,
    pub captured_at: DateTime<Local>,
}

impl CapturedFrame {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(FramePixels::Rgba8 { width, height, data })
    }

    pub fn from_bgra(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(FramePixels::Bgra8 { width, height, data })
    }

    pub fn from_encoded(bytes: Vec<u8>) -> Self {
        Self::new(FramePixels::Encoded(bytes))
    }

    fn new(pixels: FramePixels) -> Self {
        Self {
            pixels,
            captured_at: Local::now(),
        }
    }

    /// Native dimensions, when known without decoding
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match &self.pixels {
            FramePixels::Rgba8 { width, height, .. } | FramePixels::Bgra8 { width, height, .. } => {
                Some((*width, *height))
            }
            FramePixels::Encoded(_) => None,
        }
    }

    pub fn byte_len(&self) -> usize {
        match &self.pixels {
            FramePixels::Rgba8 { data, .. } | FramePixels::Bgra8 { data, .. } => data.len(),
            FramePixels::Encoded(bytes) => bytes.len(),
        }
    }
}

/// Anything that can hand the controller a still frame on demand
pub trait FrameSource: Send {
    fn capture_frame(&mut self) -> Result<CapturedFrame, CaptureError>;

    /// Short human-readable name used in logs and the GUI
    fn describe(&self) -> String;
}
