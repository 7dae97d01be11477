// src/capture/camera.rs
use log::{debug, info};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Buffer, Camera};

use super::frame::{CaptureError, CapturedFrame, FrameSource};

/// Still frame from a webcam. The device is opened per capture so the
/// source can move to whichever thread owns the controller.
pub struct CameraSource {
    index: u32,
}

impl CameraSource {
    pub fn new() -> Self {
        Self { index: 0 }
    }

    pub fn with_index(index: u32) -> Self {
        Self { index }
    }

    fn open(&self) -> Result<Camera, CaptureError> {
        let devices =
            nokhwa::query(ApiBackend::Auto).map_err(|e| CaptureError::Device(e.to_string()))?;
        debug!("{} camera(s) found", devices.len());
        if devices.len() <= self.index as usize {
            return Err(CaptureError::NoDevice);
        }

        let format =
            RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);
        Camera::new(CameraIndex::Index(self.index), format)
            .map_err(|e| CaptureError::Device(e.to_string()))
    }
}

impl Default for CameraSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for CameraSource {
    fn capture_frame(&mut self) -> Result<CapturedFrame, CaptureError> {
        info!("Capturing from camera #{}", self.index);
        let mut camera = self.open()?;
        camera
            .open_stream()
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        let buffer = camera.frame().map_err(|e| CaptureError::Device(e.to_string()));
        if let Err(e) = camera.stop_stream() {
            debug!("Camera stream did not stop cleanly: {}", e);
        }

        let frame = frame_from_buffer(&buffer?)?;
        if let Some((width, height)) = frame.dimensions() {
            info!("Camera frame captured: {}x{}", width, height);
        }
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("camera #{}", self.index)
    }
}

/// Decode whatever the driver delivered (MJPEG, YUYV, ...) into RGBA
pub fn frame_from_buffer(buffer: &Buffer) -> Result<CapturedFrame, CaptureError> {
    let image = buffer
        .decode_image::<RgbAFormat>()
        .map_err(|e| CaptureError::Device(e.to_string()))?;
    let (width, height) = (image.width(), image.height());
    Ok(CapturedFrame::from_rgba(width, height, image.into_raw()))
}
