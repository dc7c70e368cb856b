pub mod surface;
pub mod window;

pub use surface::{present, PreviewEffect, SurfaceOptions, SurfaceState, VisibleSurface};
pub use window::Sdl2Display;
