use thiserror::Error;
use zune_jpeg::JpegDecoder;

use super::frame::{FrameBuffer, FrameError, PixelFormat, RawFrame};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("jpeg decode failed: {0}")]
    Jpeg(String),

    #[error("{format:?} payload of {actual} bytes too short for {width}x{height}")]
    Truncated {
        format: PixelFormat,
        width: u32,
        height: u32,
        actual: usize,
    },

    #[error("jpeg is {actual:?}, stream negotiated {expected:?}")]
    Dimensions {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Decode a device frame into an RGBA buffer of its declared dimensions
pub fn decode_frame(raw: &RawFrame) -> Result<FrameBuffer, DecodeError> {
    let (width, height) = (raw.meta.width, raw.meta.height);
    let pixels = width as usize * height as usize;
    let data = &raw.data[..];

    let rgba = match raw.meta.format {
        PixelFormat::Mjpeg => {
            let mut decoder = JpegDecoder::new(data);
            let rgb = decoder
                .decode()
                .map_err(|e| DecodeError::Jpeg(format!("{e:?}")))?;
            let expected = (width as usize, height as usize);
            if let Some(actual) = decoder.dimensions() {
                if actual != expected {
                    return Err(DecodeError::Dimensions { expected, actual });
                }
            }
            if rgb.len() < pixels * 3 {
                return Err(truncated(raw, rgb.len()));
            }
            rgb_to_rgba(&rgb[..pixels * 3])
        }
        PixelFormat::Rgb24 => {
            if data.len() < pixels * 3 {
                return Err(truncated(raw, data.len()));
            }
            rgb_to_rgba(&data[..pixels * 3])
        }
        PixelFormat::Yuyv => {
            // An odd pixel count still arrives as whole Y0 U Y1 V macropixels
            let packed = pixels.div_ceil(2) * 4;
            if data.len() < packed {
                return Err(truncated(raw, data.len()));
            }
            let mut rgba = yuyv_to_rgba(&data[..packed]);
            rgba.truncate(pixels * 4);
            rgba
        }
    };

    Ok(FrameBuffer::new(width, height, rgba)?)
}

fn truncated(raw: &RawFrame, actual: usize) -> DecodeError {
    DecodeError::Truncated {
        format: raw.meta.format,
        width: raw.meta.width,
        height: raw.meta.height,
        actual,
    }
}

fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for chunk in rgb.chunks_exact(3) {
        rgba.extend_from_slice(chunk);
        rgba.push(255);
    }
    rgba
}

/// YUYV 4:2:2 (Y0 U Y1 V per pixel pair), BT.601 studio range
fn yuyv_to_rgba(yuyv: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(yuyv.len() * 2);
    for chunk in yuyv.chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgba.extend_from_slice(&yuv_to_rgba(y0, u, v));
        rgba.extend_from_slice(&yuv_to_rgba(y1, u, v));
    }
    rgba
}

fn yuv_to_rgba(y: u8, u: u8, v: u8) -> [u8; 4] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;
    [
        r.clamp(0, 255) as u8,
        g.clamp(0, 255) as u8,
        b.clamp(0, 255) as u8,
        255,
    ]
}
