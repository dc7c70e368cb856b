pub mod decoder;
pub mod frame;
pub mod source;
pub mod synthetic;
pub mod v4l2;

pub use frame::{FrameBuffer, FrameError, PixelFormat, RawFrame};
pub use source::{CaptureBackend, CaptureError, CaptureRequest, FacingMode, LiveStream};
pub use synthetic::{FrameFeed, SyntheticBackend};
pub use v4l2::V4l2Backend;
