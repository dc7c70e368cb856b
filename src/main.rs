//! mirrorcam: live camera mirror with per-frame filters

use std::path::PathBuf;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use tracing::info;

use mirrorcam::capture::{CaptureBackend, SyntheticBackend, V4l2Backend};
use mirrorcam::display::Sdl2Display;
use mirrorcam::session::Session;
use mirrorcam::Config;

#[derive(Parser)]
#[command(name = "mirrorcam")]
#[command(about = "Live camera mirror with grayscale, sepia, blur and edge filters")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capture device path, overrides the configuration (e.g. /dev/video0)
    #[arg(short, long)]
    device: Option<String>,

    /// Use a generated test pattern instead of a camera
    #[arg(long)]
    synthetic: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mirrorcam=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    let cli = Cli::parse();

    info!("mirrorcam launching...");

    let config = Config::load(cli.config.as_deref())?;
    let device = cli.device.or_else(|| config.device_path());

    let backend: Box<dyn CaptureBackend> = if cli.synthetic {
        info!("Using synthetic test pattern");
        Box::new(SyntheticBackend::pattern(
            config.capture.ideal_width,
            config.capture.ideal_height,
        ))
    } else {
        info!(
            "Using capture device: {}",
            device.as_deref().unwrap_or("auto-detect")
        );
        Box::new(V4l2Backend::new(
            device,
            config.capture.buffer_count,
            config.pipeline.frame_queue_size,
            tokio::runtime::Handle::current(),
        ))
    };

    let mut session = Session::new(config.capture_request(), config.surface_options());

    let sdl_context = sdl2::init().map_err(|e| eyre!(e))?;
    let mut app = Sdl2Display::new(&sdl_context, config.display.width, config.display.height)?;
    app.run(&sdl_context, &mut session, backend.as_ref())?;

    info!("mirrorcam shutting down");
    Ok(())
}
