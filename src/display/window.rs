//! SDL2 Window Display Module
//! Owns the window, maps keys to session commands and drives the render loop.
//! Vsync on the canvas paces the loop to the display refresh.

use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use tracing::{debug, info, warn};

use crate::capture::{CaptureBackend, FrameBuffer};
use crate::display::surface;
use crate::filter::FilterMode;
use crate::session::{handle_command, Command, CommandOutcome, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Command(Command),
    Quit,
}

const BINDINGS: &[(Keycode, KeyAction)] = &[
    (Keycode::S, KeyAction::Command(Command::Start)),
    (Keycode::X, KeyAction::Command(Command::Stop)),
    (Keycode::N, KeyAction::Command(Command::SetFilter(FilterMode::Passthrough))),
    (Keycode::Num1, KeyAction::Command(Command::SetFilter(FilterMode::Passthrough))),
    (Keycode::G, KeyAction::Command(Command::SetFilter(FilterMode::Grayscale))),
    (Keycode::Num2, KeyAction::Command(Command::SetFilter(FilterMode::Grayscale))),
    (Keycode::P, KeyAction::Command(Command::SetFilter(FilterMode::Sepia))),
    (Keycode::Num3, KeyAction::Command(Command::SetFilter(FilterMode::Sepia))),
    (Keycode::B, KeyAction::Command(Command::SetFilter(FilterMode::Blur))),
    (Keycode::Num4, KeyAction::Command(Command::SetFilter(FilterMode::Blur))),
    (Keycode::E, KeyAction::Command(Command::SetFilter(FilterMode::EdgeDetect))),
    (Keycode::Num5, KeyAction::Command(Command::SetFilter(FilterMode::EdgeDetect))),
    (Keycode::Q, KeyAction::Quit),
    (Keycode::Escape, KeyAction::Quit),
];

pub fn key_action(key: Keycode) -> Option<KeyAction> {
    BINDINGS
        .iter()
        .find(|(bound, _)| *bound == key)
        .map(|(_, action)| *action)
}

/// Window title carrying status, selected mode and the keys that currently work
pub fn title_for(session: &Session) -> String {
    let enabled = session.enablement();
    let keys = if enabled.start {
        "S start"
    } else {
        "X stop | 1 normal 2 grayscale 3 sepia 4 blur 5 edge"
    };
    let status = session.status();
    let marker = if status.is_error { "!" } else { "" };
    format!(
        "mirrorcam [{}] {}{} ({}, Q quit)",
        enabled.active_filter.name(),
        marker,
        status.message,
        keys
    )
}

/// Window size to switch to after `command` ran: the negotiated stream size
/// once a start succeeds, otherwise unchanged
pub fn window_size_after(
    command: Command,
    outcome: &CommandOutcome,
    session: &Session,
) -> Option<(u32, u32)> {
    match (command, outcome) {
        (Command::Start, CommandOutcome::Applied) => {
            let surface = session.surface();
            Some((surface.width, surface.height))
        }
        _ => None,
    }
}

/// SDL2 Window Display
pub struct Sdl2Display {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
}

impl Sdl2Display {
    pub fn new(sdl_context: &sdl2::Sdl, width: u32, height: u32) -> Result<Self> {
        let video_subsystem = sdl_context.video().map_err(|e| eyre!(e))?;

        let window = video_subsystem
            .window("mirrorcam", width, height)
            .position_centered()
            .resizable()
            .build()?;

        let canvas = window.into_canvas().present_vsync().build()?;
        let texture_creator = canvas.texture_creator();

        Ok(Self {
            canvas,
            texture_creator,
        })
    }

    pub fn render_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        let (width, height) = frame.dimensions();
        let mut texture = self
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::RGBA32, width, height)
            .map_err(|e| eyre!(e))?;

        texture
            .update(None, frame.as_bytes(), (width * 4) as usize)
            .map_err(|e| eyre!(e))?;

        self.canvas.set_draw_color(Color::BLACK);
        self.canvas.clear();
        self.canvas
            .copy(&texture, None, None)
            .map_err(|e| eyre!(e))?;

        self.canvas.present();
        Ok(())
    }

    fn render_idle(&mut self) {
        self.canvas.set_draw_color(Color::BLACK);
        self.canvas.clear();
        self.canvas.present();
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let window = self.canvas.window_mut();
        if window.size() == (width, height) {
            return Ok(());
        }
        info!("Resizing window to {}x{}", width, height);
        window.set_size(width, height).map_err(|e| eyre!(e))
    }

    fn update_title(&mut self, session: &Session) -> Result<()> {
        self.canvas
            .window_mut()
            .set_title(&title_for(session))
            .map_err(|e| eyre!(e))
    }

    /// Event loop: commands from the keyboard, one tick per refresh
    pub fn run(
        &mut self,
        sdl_context: &sdl2::Sdl,
        session: &mut Session,
        backend: &dyn CaptureBackend,
    ) -> Result<()> {
        let mut event_pump = sdl_context.event_pump().map_err(|e| eyre!(e))?;
        self.update_title(session)?;

        'running: loop {
            for event in event_pump.poll_iter() {
                let key = match event {
                    Event::Quit { .. } => {
                        info!("Quit event received");
                        break 'running;
                    }
                    Event::KeyDown {
                        keycode: Some(key),
                        repeat: false,
                        ..
                    } => key,
                    _ => continue,
                };

                match key_action(key) {
                    Some(KeyAction::Quit) => {
                        info!("Quit key pressed");
                        break 'running;
                    }
                    Some(KeyAction::Command(command)) => {
                        if !session.enablement().allows(command) {
                            debug!("{:?} not enabled", command);
                            continue;
                        }
                        let outcome = handle_command(session, backend, command);
                        if let Some((width, height)) = window_size_after(command, &outcome, session) {
                            self.resize(width, height)?;
                        }
                        if let CommandOutcome::Failed(e) = outcome {
                            warn!("Command {:?} failed: {}", command, e);
                        }
                        self.update_title(session)?;
                    }
                    None => {}
                }
            }

            match session.tick() {
                Some(rendered) => {
                    let shown = surface::present(&rendered.pixels, &rendered.surface);
                    self.render_frame(&shown)?;
                }
                None if !session.is_active() => self.render_idle(),
                // Camera hasn't produced a frame yet; keep the last one on screen
                None => std::thread::sleep(Duration::from_millis(1)),
            }
        }

        handle_command(session, backend, Command::Stop);
        Ok(())
    }
}
