//! Camera-less backend: a generated test pattern or frames pushed by the caller

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flume::{Receiver, Sender};
use tracing::info;

use crate::capture::frame::FrameBuffer;
use crate::capture::source::{CaptureBackend, CaptureError, CaptureRequest, LiveStream};

/// Colour bars, left to right
const BARS: [[u8; 3]; 7] = [
    [255, 255, 255],
    [255, 255, 0],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 0, 0],
    [0, 0, 255],
];

/// Acquisition and release counters, shared with every stream the backend hands out
#[derive(Debug, Default)]
pub struct SyntheticStats {
    acquired: AtomicUsize,
    stopped: AtomicUsize,
}

impl SyntheticStats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::Relaxed)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// Sender half for scripted streams
pub type FrameFeed = Sender<FrameBuffer>;

enum Source {
    Pattern,
    Scripted(Receiver<FrameBuffer>),
}

pub struct SyntheticBackend {
    width: u32,
    height: u32,
    source: Source,
    failure: Option<CaptureError>,
    stats: Arc<SyntheticStats>,
}

impl SyntheticBackend {
    /// Moving colour bars, a new frame on every poll
    pub fn pattern(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            source: Source::Pattern,
            failure: None,
            stats: Arc::default(),
        }
    }

    /// Frames arrive only when pushed through the returned feed
    pub fn scripted(width: u32, height: u32) -> (Self, FrameFeed) {
        let (tx, rx) = flume::unbounded();
        let backend = Self {
            width,
            height,
            source: Source::Scripted(rx),
            failure: None,
            stats: Arc::default(),
        };
        (backend, tx)
    }

    /// Every acquisition fails with `err`
    pub fn failing(err: CaptureError) -> Self {
        Self {
            failure: Some(err),
            ..Self::pattern(0, 0)
        }
    }

    pub fn stats(&self) -> Arc<SyntheticStats> {
        self.stats.clone()
    }
}

impl CaptureBackend for SyntheticBackend {
    fn acquire(&self, request: &CaptureRequest) -> Result<Box<dyn LiveStream>, CaptureError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if request.audio {
            return Err(CaptureError::AudioUnsupported);
        }

        self.stats.acquired.fetch_add(1, Ordering::Relaxed);
        info!("Synthetic {}x{} stream opened", self.width, self.height);

        let source = match &self.source {
            Source::Pattern => Source::Pattern,
            Source::Scripted(rx) => Source::Scripted(rx.clone()),
        };
        Ok(Box::new(SyntheticStream {
            width: self.width,
            height: self.height,
            source,
            sequence: 0,
            stopped: false,
            stats: self.stats.clone(),
        }))
    }
}

struct SyntheticStream {
    width: u32,
    height: u32,
    source: Source,
    sequence: u32,
    stopped: bool,
    stats: Arc<SyntheticStats>,
}

impl SyntheticStream {
    fn bars(&self) -> FrameBuffer {
        let mut frame = FrameBuffer::blank(self.width, self.height);
        let bar_width = (self.width / BARS.len() as u32).max(1);
        for y in 0..self.height {
            for x in 0..self.width {
                // Bars scroll one pixel per frame
                let shifted = (x + self.sequence) % self.width.max(1);
                let bar = ((shifted / bar_width) as usize).min(BARS.len() - 1);
                let [r, g, b] = BARS[bar];
                frame.set_pixel(x, y, [r, g, b, 255]);
            }
        }
        frame
    }
}

impl LiveStream for SyntheticStream {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn poll_frame(&mut self) -> Option<FrameBuffer> {
        if self.stopped {
            return None;
        }
        match &self.source {
            Source::Pattern => {
                let frame = self.bars();
                self.sequence = self.sequence.wrapping_add(1);
                Some(frame)
            }
            Source::Scripted(rx) => rx.try_iter().last(),
        }
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stats.stopped.fetch_add(1, Ordering::Relaxed);
        }
    }
}
