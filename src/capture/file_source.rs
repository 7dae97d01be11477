// src/capture/file_source.rs
use log::info;
use std::path::{Path, PathBuf};

use super::frame::{CaptureError, CapturedFrame, FrameSource};

/// Reads a still image from disk each time a frame is requested
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FileSource {
    fn capture_frame(&mut self) -> Result<CapturedFrame, CaptureError> {
        info!("Loading frame from {}", self.path.display());
        let bytes = std::fs::read(&self.path).map_err(|source| CaptureError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        info!("Frame loaded: {} bytes", bytes.len());
        Ok(CapturedFrame::from_encoded(bytes))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
