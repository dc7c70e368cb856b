use crate::capture::frame::PixelFormat;
use crate::capture::CaptureError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use v4l::{capability::Flags, video::Capture, Device, FourCC};

// Detected capture device info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundDevice {
    pub path: String,
    pub format: PixelFormat,
}

impl FoundDevice {
    pub fn new(path: String, format: PixelFormat) -> Self {
        Self { path, format }
    }

    /// Open a known device path and pick its best decodable format
    pub fn inspect(path: &str) -> Result<Self, CaptureError> {
        let dev = Device::with_path(path)?;
        let caps = dev.query_caps()?;
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            return Err(CaptureError::ConstraintUnsatisfiable(format!(
                "{} does not support video capture",
                path
            )));
        }
        let format = preferred_format(&dev).ok_or_else(|| {
            CaptureError::ConstraintUnsatisfiable(format!("{} offers no decodable format", path))
        })?;
        Ok(Self::new(path.to_string(), format))
    }
}

/// Map a V4L2 fourcc onto a format we can decode
pub fn pixel_format(fourcc: FourCC) -> Option<PixelFormat> {
    if fourcc == FourCC::new(b"MJPG") {
        Some(PixelFormat::Mjpeg)
    } else if fourcc == FourCC::new(b"YUYV") {
        Some(PixelFormat::Yuyv)
    } else if fourcc == FourCC::new(b"RGB3") {
        Some(PixelFormat::Rgb24)
    } else {
        None
    }
}

pub fn fourcc(format: PixelFormat) -> FourCC {
    match format {
        PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
        PixelFormat::Yuyv => FourCC::new(b"YUYV"),
        PixelFormat::Rgb24 => FourCC::new(b"RGB3"),
    }
}

// MJPEG first, it's the only format most webcams deliver at speed
fn preferred_format(dev: &Device) -> Option<PixelFormat> {
    let formats = dev.enum_formats().ok()?;
    let offered: Vec<PixelFormat> = formats
        .iter()
        .filter_map(|fmt| pixel_format(fmt.fourcc))
        .collect();
    [PixelFormat::Mjpeg, PixelFormat::Yuyv, PixelFormat::Rgb24]
        .into_iter()
        .find(|f| offered.contains(f))
}

/// Auto-detect best capture device
pub fn auto_detect_device() -> Result<FoundDevice, CaptureError> {
    use std::path::Path;

    info!("Auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }

        match FoundDevice::inspect(&path) {
            Ok(found) => {
                info!("Found {:?} device: {}", found.format, path);
                return Ok(found);
            }
            Err(CaptureError::PermissionDenied(reason)) => {
                return Err(CaptureError::PermissionDenied(reason));
            }
            Err(e) => debug!("Skipping {}: {}", path, e),
        }
    }

    Err(CaptureError::NoDevice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_round_trips_supported_formats() {
        for format in [PixelFormat::Mjpeg, PixelFormat::Yuyv, PixelFormat::Rgb24] {
            assert_eq!(pixel_format(fourcc(format)), Some(format));
        }
        assert_eq!(pixel_format(FourCC::new(b"NV12")), None);
    }

    #[test]
    fn inspecting_missing_path_reports_no_device() {
        let err = FoundDevice::inspect("/nonexistent/video99").unwrap_err();
        assert_eq!(err, CaptureError::NoDevice);
    }
}
