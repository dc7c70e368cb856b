//! Which surface is on screen and the visual effects applied at presentation

use image::{imageops, RgbaImage};

use crate::capture::frame::FrameBuffer;
use crate::filter::FilterMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibleSurface {
    /// Raw camera feed
    Preview,
    /// Pixel buffer written by the filter engine
    Processed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviewEffect {
    None,
    Blur { radius_px: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceOptions {
    pub blur_radius_px: f32,
    pub mirror_processed: bool,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            blur_radius_px: 5.0,
            mirror_processed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceState {
    pub width: u32,
    pub height: u32,
    pub visible: VisibleSurface,
    pub preview_effect: PreviewEffect,
    pub mirrored: bool,
}

impl SurfaceState {
    /// Plain preview, no effects; what is shown while no stream runs
    pub fn preview(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            visible: VisibleSurface::Preview,
            preview_effect: PreviewEffect::None,
            mirrored: false,
        }
    }

    /// Re-arrange for `mode` keeping the current dimensions
    pub fn apply_mode(&mut self, mode: FilterMode, options: &SurfaceOptions) {
        if mode.transforms_pixels() {
            self.visible = VisibleSurface::Processed;
            self.preview_effect = PreviewEffect::None;
            self.mirrored = options.mirror_processed;
            return;
        }

        self.visible = VisibleSurface::Preview;
        self.mirrored = false;
        self.preview_effect = match mode {
            FilterMode::Blur => PreviewEffect::Blur {
                radius_px: options.blur_radius_px,
            },
            _ => PreviewEffect::None,
        };
    }
}

/// Final pixels for the window: the preview's blur or the processed surface's
/// mirror, whichever the surface state asks for.
pub fn present(frame: &FrameBuffer, surface: &SurfaceState) -> FrameBuffer {
    match surface.visible {
        VisibleSurface::Preview => match surface.preview_effect {
            PreviewEffect::Blur { radius_px } if radius_px > 0.0 => {
                with_image(frame, |img| imageops::blur(img, radius_px))
            }
            _ => frame.clone(),
        },
        VisibleSurface::Processed if surface.mirrored => {
            with_image(frame, |img| imageops::flip_horizontal(img))
        }
        VisibleSurface::Processed => frame.clone(),
    }
}

fn with_image(frame: &FrameBuffer, op: impl FnOnce(&RgbaImage) -> RgbaImage) -> FrameBuffer {
    let (width, height) = frame.dimensions();
    let Some(img) = RgbaImage::from_raw(width, height, frame.as_bytes().to_vec()) else {
        return frame.clone();
    };
    FrameBuffer::new(width, height, op(&img).into_raw()).unwrap_or_else(|_| frame.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripes() -> FrameBuffer {
        let mut frame = FrameBuffer::blank(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                let v = if x % 2 == 0 { 255 } else { 0 };
                frame.set_pixel(x, y, [v, v, v, 255]);
            }
        }
        frame
    }

    #[test]
    fn processed_modes_show_mirrored_canvas() {
        let options = SurfaceOptions::default();
        for mode in [FilterMode::Grayscale, FilterMode::Sepia, FilterMode::EdgeDetect] {
            let mut surface = SurfaceState::preview(4, 4);
            surface.apply_mode(mode, &options);
            assert_eq!(surface.visible, VisibleSurface::Processed);
            assert!(surface.mirrored);
            assert_eq!(surface.preview_effect, PreviewEffect::None);
        }
    }

    #[test]
    fn blur_stays_on_preview_unmirrored() {
        let mut surface = SurfaceState::preview(4, 4);
        surface.apply_mode(FilterMode::Grayscale, &SurfaceOptions::default());
        surface.apply_mode(FilterMode::Blur, &SurfaceOptions::default());
        assert_eq!(surface.visible, VisibleSurface::Preview);
        assert!(!surface.mirrored);
        assert_eq!(surface.preview_effect, PreviewEffect::Blur { radius_px: 5.0 });
    }

    #[test]
    fn passthrough_clears_effects() {
        let mut surface = SurfaceState::preview(4, 4);
        surface.apply_mode(FilterMode::Blur, &SurfaceOptions::default());
        surface.apply_mode(FilterMode::Passthrough, &SurfaceOptions::default());
        assert_eq!(surface, SurfaceState::preview(4, 4));
    }

    #[test]
    fn mirroring_can_be_disabled() {
        let options = SurfaceOptions {
            mirror_processed: false,
            ..SurfaceOptions::default()
        };
        let mut surface = SurfaceState::preview(4, 4);
        surface.apply_mode(FilterMode::Sepia, &options);
        assert!(!surface.mirrored);
    }

    #[test]
    fn present_mirrors_processed_surface() {
        let mut frame = FrameBuffer::blank(3, 1);
        frame.set_pixel(0, 0, [1, 0, 0, 255]);
        frame.set_pixel(2, 0, [3, 0, 0, 255]);

        let mut surface = SurfaceState::preview(3, 1);
        surface.apply_mode(FilterMode::Grayscale, &SurfaceOptions::default());
        let shown = present(&frame, &surface);
        assert_eq!(shown.pixel(0, 0), [3, 0, 0, 255]);
        assert_eq!(shown.pixel(2, 0), [1, 0, 0, 255]);
    }

    #[test]
    fn present_blurs_preview_only_when_asked() {
        let frame = stripes();
        let plain = SurfaceState::preview(8, 8);
        assert_eq!(present(&frame, &plain), frame);

        let mut blurred = plain;
        blurred.apply_mode(FilterMode::Blur, &SurfaceOptions::default());
        let shown = present(&frame, &blurred);
        assert_eq!(shown.dimensions(), (8, 8));
        let centre = shown.pixel(4, 4);
        assert!(centre[0] > 0 && centre[0] < 255, "got {centre:?}");
    }
}
