//! Frame filter engine: pure transforms from one captured frame to the frame
//! shown on the processed surface

pub mod color;
pub mod edge;

use serde::{Deserialize, Serialize};

use crate::capture::frame::FrameBuffer;

pub use color::{grayscale, sepia};
pub use edge::{edge_detect, sobel_magnitude};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    #[default]
    #[serde(rename = "normal")]
    Passthrough,
    #[serde(rename = "grayscale")]
    Grayscale,
    #[serde(rename = "sepia")]
    Sepia,
    #[serde(rename = "blur")]
    Blur,
    #[serde(rename = "edge")]
    EdgeDetect,
}

impl FilterMode {
    pub const ALL: [FilterMode; 5] = [
        FilterMode::Passthrough,
        FilterMode::Grayscale,
        FilterMode::Sepia,
        FilterMode::Blur,
        FilterMode::EdgeDetect,
    ];

    /// Passthrough and Blur are display-level effects; everything else
    /// rewrites pixels.
    pub fn transforms_pixels(self) -> bool {
        !matches!(self, FilterMode::Passthrough | FilterMode::Blur)
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterMode::Passthrough => "normal",
            FilterMode::Grayscale => "grayscale",
            FilterMode::Sepia => "sepia",
            FilterMode::Blur => "blur",
            FilterMode::EdgeDetect => "edge",
        }
    }
}

/// Run one frame through `mode`, returning a new buffer
pub fn render(mode: FilterMode, frame: &FrameBuffer) -> FrameBuffer {
    match mode {
        FilterMode::Passthrough | FilterMode::Blur => frame.clone(),
        FilterMode::Grayscale => grayscale(frame),
        FilterMode::Sepia => sepia(frame),
        FilterMode::EdgeDetect => edge_detect(frame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> FrameBuffer {
        let mut frame = FrameBuffer::blank(width, height);
        for y in 0..height {
            for x in 0..width {
                frame.set_pixel(x, y, [(x * 40) as u8, (y * 60) as u8, 90, 128]);
            }
        }
        frame
    }

    #[test]
    fn display_level_modes_return_frame_verbatim() {
        let frame = gradient(5, 4);
        assert_eq!(render(FilterMode::Passthrough, &frame), frame);
        assert_eq!(render(FilterMode::Blur, &frame), frame);
    }

    #[test]
    fn dispatch_matches_individual_filters() {
        let frame = gradient(5, 4);
        assert_eq!(render(FilterMode::Grayscale, &frame), grayscale(&frame));
        assert_eq!(render(FilterMode::Sepia, &frame), sepia(&frame));
        assert_eq!(render(FilterMode::EdgeDetect, &frame), edge_detect(&frame));
    }

    #[test]
    fn every_mode_preserves_dimensions() {
        let frame = gradient(6, 3);
        for mode in FilterMode::ALL {
            assert_eq!(render(mode, &frame).dimensions(), (6, 3), "{mode:?}");
        }
    }

    #[test]
    fn pixel_transform_classification() {
        assert!(!FilterMode::Passthrough.transforms_pixels());
        assert!(!FilterMode::Blur.transforms_pixels());
        assert!(FilterMode::Grayscale.transforms_pixels());
        assert!(FilterMode::Sepia.transforms_pixels());
        assert!(FilterMode::EdgeDetect.transforms_pixels());
    }
}
