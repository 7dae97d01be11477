// src/capture/screenshot.rs
use log::info;
use screenshots::Screen;

use super::frame::{CaptureError, CapturedFrame, FrameSource};

/// Grabs the primary display, the desktop stand-in for a camera preview
pub struct ScreenSource {
    screen_index: usize,
}

impl ScreenSource {
    pub fn new() -> Self {
        Self { screen_index: 0 }
    }

    pub fn with_screen(screen_index: usize) -> Self {
        Self { screen_index }
    }
}

impl Default for ScreenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ScreenSource {
    fn capture_frame(&mut self) -> Result<CapturedFrame, CaptureError> {
        info!("Capturing screen #{}", self.screen_index);
        let screens = Screen::all().map_err(|e| CaptureError::Device(e.to_string()))?;
        let screen = screens.get(self.screen_index).ok_or(CaptureError::NoDevice)?;

        let image = screen
            .capture()
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        let width = image.width() as u32;
        let height = image.height() as u32;

        // the screenshots crate hands back BGRA; the encoder swaps channels
        let buffer = image.as_raw().to_vec();

        info!("Screen captured: {}x{}", width, height);
        Ok(CapturedFrame::from_bgra(width, height, buffer))
    }

    fn describe(&self) -> String {
        format!("screen #{}", self.screen_index)
    }
}
