// src/capture/mod.rs
#[cfg(feature = "camera")]
pub mod camera;
pub mod file_source;
pub mod frame;
pub mod screenshot;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use file_source::FileSource;
pub use frame::{CaptureError, CapturedFrame, FramePixels, FrameSource};
pub use screenshot::ScreenSource;
