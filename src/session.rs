//! Capture/display controller: session state, the command reducer and the
//! per-frame render step

use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::capture::{CaptureBackend, CaptureError, CaptureRequest, FrameBuffer, LiveStream};
use crate::display::surface::{SurfaceOptions, SurfaceState};
use crate::filter::{self, FilterMode};

pub const READY_MESSAGE: &str = "Press S to start the camera";
pub const REQUESTING_MESSAGE: &str = "Requesting camera access...";
pub const STARTED_MESSAGE: &str = "Camera started! Try different effects below.";
pub const STOPPED_MESSAGE: &str = "Camera stopped";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    SetFilter(FilterMode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// Command not enabled in the current state; nothing changed
    Ignored,
    Failed(CaptureError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub is_error: bool,
}

impl Status {
    fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }
}

/// Which commands may currently be issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enablement {
    pub start: bool,
    pub stop: bool,
    pub filters: bool,
    /// Mode command shown as selected
    pub active_filter: FilterMode,
}

impl Enablement {
    pub fn allows(&self, command: Command) -> bool {
        match command {
            Command::Start => self.start,
            Command::Stop => self.stop,
            Command::SetFilter(_) => self.filters,
        }
    }
}

/// Output of one tick: the display-surface pixels and how to show them
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    pub pixels: FrameBuffer,
    pub surface: SurfaceState,
}

pub struct Session {
    active: bool,
    filter_mode: FilterMode,
    stream: Option<Box<dyn LiveStream>>,
    surface: SurfaceState,
    status: Status,
    request: CaptureRequest,
    options: SurfaceOptions,
}

impl Session {
    pub fn new(request: CaptureRequest, options: SurfaceOptions) -> Self {
        Self {
            active: false,
            filter_mode: FilterMode::Passthrough,
            stream: None,
            surface: SurfaceState::preview(request.ideal_width, request.ideal_height),
            status: Status::info(READY_MESSAGE),
            request,
            options,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn surface(&self) -> &SurfaceState {
        &self.surface
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn enablement(&self) -> Enablement {
        Enablement {
            start: !self.active,
            stop: self.active,
            filters: self.active,
            active_filter: self.filter_mode,
        }
    }

    fn start(&mut self, backend: &dyn CaptureBackend) -> CommandOutcome {
        if self.active {
            debug!("start ignored, stream already running");
            return CommandOutcome::Ignored;
        }

        self.status = Status::info(REQUESTING_MESSAGE);
        info!("{}", REQUESTING_MESSAGE);

        match backend.acquire(&self.request) {
            Ok(stream) => {
                let (width, height) = stream.dimensions();
                self.surface = SurfaceState::preview(width, height);
                self.surface.apply_mode(self.filter_mode, &self.options);
                self.stream = Some(stream);
                self.active = true;
                self.status = Status::info(STARTED_MESSAGE);
                info!(width, height, mode = self.filter_mode.name(), "camera started");
                CommandOutcome::Applied
            }
            Err(e) => {
                error!("Error accessing camera: {}", e);
                self.status = Status::error(format!("Error: {}", e));
                CommandOutcome::Failed(e)
            }
        }
    }

    fn stop(&mut self) -> CommandOutcome {
        if !self.active {
            return CommandOutcome::Ignored;
        }

        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        self.active = false;
        self.surface = SurfaceState::preview(self.surface.width, self.surface.height);
        self.status = Status::info(STOPPED_MESSAGE);
        info!("camera stopped");
        CommandOutcome::Applied
    }

    fn set_filter(&mut self, mode: FilterMode) -> CommandOutcome {
        if !self.active {
            debug!(mode = mode.name(), "filter change ignored while inactive");
            return CommandOutcome::Ignored;
        }

        self.filter_mode = mode;
        self.surface.apply_mode(mode, &self.options);
        debug!(mode = mode.name(), surface = ?self.surface.visible, "filter selected");
        CommandOutcome::Applied
    }

    /// One render-loop iteration. `None` while inactive or when the stream
    /// has no ready frame.
    pub fn tick(&mut self) -> Option<RenderedFrame> {
        if !self.active {
            return None;
        }
        let frame = self.stream.as_mut()?.poll_frame()?;

        if frame.dimensions() != (self.surface.width, self.surface.height) {
            warn!(
                "dropping {}x{} frame on {}x{} surface",
                frame.width(),
                frame.height(),
                self.surface.width,
                self.surface.height
            );
            metrics::counter!("frames_dropped").increment(1);
            return None;
        }

        let started = Instant::now();
        let pixels = filter::render(self.filter_mode, &frame);
        metrics::histogram!("tick_time_us").record(started.elapsed().as_micros() as f64);

        Some(RenderedFrame {
            pixels,
            surface: self.surface,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Apply one command to the session
pub fn handle_command(
    session: &mut Session,
    backend: &dyn CaptureBackend,
    command: Command,
) -> CommandOutcome {
    match command {
        Command::Start => session.start(backend),
        Command::Stop => session.stop(),
        Command::SetFilter(mode) => session.set_filter(mode),
    }
}
