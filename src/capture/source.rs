use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::frame::FrameBuffer;

/// Camera acquisition failures.
///
/// The only user-facing error category; reported through the session status
/// and never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no capture device available")]
    NoDevice,

    #[error("constraint unsatisfiable: {0}")]
    ConstraintUnsatisfiable(String),

    #[error("audio capture is not supported")]
    AudioUnsupported,

    #[error("device error: {0}")]
    Device(String),
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => Self::NoDevice,
            _ => Self::Device(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

/// Stream constraints handed to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
    pub audio: bool,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 480,
            facing: FacingMode::User,
            audio: false,
        }
    }
}

/// Source of live camera streams.
pub trait CaptureBackend {
    /// Negotiate and open a video stream. Dimensions of the returned stream
    /// are what the device settled on, which may differ from the ideal ones.
    fn acquire(&self, request: &CaptureRequest) -> Result<Box<dyn LiveStream>, CaptureError>;
}

/// An open camera stream.
pub trait LiveStream: Send {
    /// Negotiated frame dimensions, fixed for the life of the stream.
    fn dimensions(&self) -> (u32, u32);

    /// Most recent ready frame, discarding anything older. `None` when no
    /// new frame has arrived since the last poll.
    fn poll_frame(&mut self) -> Option<FrameBuffer>;

    /// Release every track of the stream.
    fn stop(&mut self);
}
