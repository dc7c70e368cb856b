//! Sobel edge detection over channel 0

use crate::capture::frame::FrameBuffer;

use super::color::to_channel;

/// Gradient magnitude at interior pixel (x, y), reading only the red channel
/// of the 3x3 neighbourhood. Unclamped.
pub fn sobel_magnitude(frame: &FrameBuffer, x: u32, y: u32) -> f64 {
    let at = |dx: i32, dy: i32| {
        let px = (x as i32 + dx) as u32;
        let py = (y as i32 + dy) as u32;
        frame.as_bytes()[frame.offset(px, py)] as f64
    };

    let (tl, tm, tr) = (at(-1, -1), at(0, -1), at(1, -1));
    let (ml, mr) = (at(-1, 0), at(1, 0));
    let (bl, bm, br) = (at(-1, 1), at(0, 1), at(1, 1));

    let gx = (tr + 2.0 * mr + br) - (tl + 2.0 * ml + bl);
    let gy = (bl + 2.0 * bm + br) - (tl + 2.0 * tm + tr);
    (gx * gx + gy * gy).sqrt()
}

/// Interior pixels get the saturated magnitude as grey with full alpha; the
/// one-pixel border stays transparent black.
pub fn edge_detect(frame: &FrameBuffer) -> FrameBuffer {
    let (width, height) = frame.dimensions();
    let mut out = FrameBuffer::blank(width, height);
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let g = to_channel(sobel_magnitude(frame, x, y));
            out.set_pixel(x, y, [g, g, g, 255]);
        }
    }
    out
}
