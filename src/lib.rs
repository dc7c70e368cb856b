pub mod capture;
pub mod display;
pub mod filter;
pub mod session;
pub mod utils;

use std::path::Path;

use serde::{Deserialize, Serialize};

use capture::{CaptureRequest, FacingMode};
use display::surface::SurfaceOptions;

/// Environment overrides look like `MIRRORCAM__CAPTURE__DEVICE=/dev/video2`
pub const ENV_PREFIX: &str = "MIRRORCAM";

/// System configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Empty means auto-detect
    pub device: String,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub blur_radius_px: f32,
    pub mirror_processed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Decoded frames buffered between the capture pump and the render loop
    pub frame_queue_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                device: String::new(),
                ideal_width: 640,
                ideal_height: 480,
                facing: FacingMode::User,
                buffer_count: 4,
            },
            display: DisplayConfig {
                width: 640,
                height: 480,
                blur_radius_px: 5.0,
                mirror_processed: true,
            },
            pipeline: PipelineConfig {
                frame_queue_size: 2,
            },
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn capture_request(&self) -> CaptureRequest {
        CaptureRequest {
            ideal_width: self.capture.ideal_width,
            ideal_height: self.capture.ideal_height,
            facing: self.capture.facing,
            audio: false,
        }
    }

    pub fn surface_options(&self) -> SurfaceOptions {
        SurfaceOptions {
            blur_radius_px: self.display.blur_radius_px,
            mirror_processed: self.display.mirror_processed,
        }
    }

    pub fn device_path(&self) -> Option<String> {
        let path = self.capture.device.trim();
        (!path.is_empty()).then(|| path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // `load` reads the process environment, which tests share
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn defaults_request_vga_user_camera() {
        let config = Config::default();
        assert_eq!(config.capture_request(), CaptureRequest::default());
        assert_eq!(config.surface_options(), SurfaceOptions::default());
        assert_eq!(config.device_path(), None);
    }

    #[test]
    fn load_without_file_gives_defaults() {
        let _env = env_guard();
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }

    #[test]
    fn file_overrides_only_what_it_names() {
        let _env = env_guard();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[capture]\ndevice = \"/dev/video2\"\nideal_width = 1280\n\n[display]\nmirror_processed = false"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.device_path().as_deref(), Some("/dev/video2"));
        assert_eq!(config.capture.ideal_width, 1280);
        assert_eq!(config.capture.ideal_height, 480);
        assert!(!config.display.mirror_processed);
        assert_eq!(config.display.blur_radius_px, 5.0);
        assert_eq!(config.pipeline.frame_queue_size, 2);
    }

    #[test]
    fn facing_mode_parses_lowercase() {
        let _env = env_guard();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[capture]\nfacing = \"environment\"").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.capture.facing, FacingMode::Environment);
    }

    #[test]
    fn missing_file_is_an_error() {
        let _env = env_guard();
        assert!(Config::load(Some(Path::new("/nonexistent/mirrorcam.toml"))).is_err());
    }

    #[test]
    fn environment_overrides_defaults() {
        let _env = env_guard();
        std::env::set_var("MIRRORCAM__CAPTURE__IDEAL_WIDTH", "1280");
        std::env::set_var("MIRRORCAM__DISPLAY__MIRROR_PROCESSED", "false");
        let loaded = Config::load(None);
        std::env::remove_var("MIRRORCAM__CAPTURE__IDEAL_WIDTH");
        std::env::remove_var("MIRRORCAM__DISPLAY__MIRROR_PROCESSED");

        let config = loaded.unwrap();
        assert_eq!(config.capture.ideal_width, 1280);
        assert_eq!(config.capture.ideal_height, 480);
        assert!(!config.display.mirror_processed);
    }

    #[test]
    fn environment_wins_over_file() {
        let _env = env_guard();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[pipeline]\nframe_queue_size = 4").unwrap();

        std::env::set_var("MIRRORCAM__PIPELINE__FRAME_QUEUE_SIZE", "8");
        let loaded = Config::load(Some(file.path()));
        std::env::remove_var("MIRRORCAM__PIPELINE__FRAME_QUEUE_SIZE");

        assert_eq!(loaded.unwrap().pipeline.frame_queue_size, 8);
    }
}
