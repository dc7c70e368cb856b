//! Per-pixel colour transforms. Alpha is never touched.

use crate::capture::frame::{FrameBuffer, CHANNELS};

pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Round then saturate into a channel byte
pub fn to_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

pub fn grayscale(frame: &FrameBuffer) -> FrameBuffer {
    map_rgb(frame, |r, g, b| {
        let gray = to_channel(luminance(r, g, b));
        [gray, gray, gray]
    })
}

pub fn sepia(frame: &FrameBuffer) -> FrameBuffer {
    map_rgb(frame, |r, g, b| {
        let (r, g, b) = (r as f64, g as f64, b as f64);
        [
            to_channel(0.393 * r + 0.769 * g + 0.189 * b),
            to_channel(0.349 * r + 0.686 * g + 0.168 * b),
            to_channel(0.272 * r + 0.534 * g + 0.131 * b),
        ]
    })
}

fn map_rgb(frame: &FrameBuffer, f: impl Fn(u8, u8, u8) -> [u8; 3]) -> FrameBuffer {
    let mut out = frame.clone();
    for px in out.as_bytes_mut().chunks_exact_mut(CHANNELS) {
        let rgb = f(px[0], px[1], px[2]);
        px[..3].copy_from_slice(&rgb);
    }
    out
}
