//! V4L2 camera backend: mmap capture on the blocking pool, frames handed to
//! the session through a bounded channel

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use flume::{Receiver, RecvTimeoutError, Sender, TrySendError};
use tokio::runtime::Handle;
use tracing::{debug, error, info, instrument, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::Device;

use crate::capture::decoder::decode_frame;
use crate::capture::frame::{FrameBuffer, FrameMetadata, PixelFormat, RawFrame};
use crate::capture::source::{CaptureBackend, CaptureError, CaptureRequest, FacingMode, LiveStream};
use crate::utils::{self, FoundDevice};

/// Upper bound on one blocking dequeue, so the pump sees the stop flag
const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(100);
/// How long `stop` waits for the pump to release the device
const PUMP_EXIT_TIMEOUT: Duration = Duration::from_secs(2);
const RETRY_BACKOFF: Duration = Duration::from_millis(10);
/// Consecutive non-fatal failures before the pump gives up
const MAX_CAPTURE_FAILURES: u32 = 50;

/// Opens V4L2 devices on demand
pub struct V4l2Backend {
    /// `None` means auto-detect on every acquisition
    device: Option<String>,
    buffer_count: u32,
    queue_size: usize,
    runtime: Handle,
}

impl V4l2Backend {
    pub fn new(device: Option<String>, buffer_count: u32, queue_size: usize, runtime: Handle) -> Self {
        Self {
            device,
            buffer_count,
            queue_size: queue_size.max(1),
            runtime,
        }
    }

    fn resolve_device(&self) -> Result<FoundDevice, CaptureError> {
        match &self.device {
            Some(path) => FoundDevice::inspect(path),
            None => utils::auto_detect_device(),
        }
    }
}

impl CaptureBackend for V4l2Backend {
    #[instrument(skip(self))]
    fn acquire(&self, request: &CaptureRequest) -> Result<Box<dyn LiveStream>, CaptureError> {
        if request.audio {
            return Err(CaptureError::AudioUnsupported);
        }
        if request.facing != FacingMode::User {
            debug!("V4L2 has no facing mode, {:?} ignored", request.facing);
        }

        let found = self.resolve_device()?;
        let mut capture = V4l2Capture::open(&found, request, self.buffer_count)?;
        capture.start_stream()?;

        let (width, height) = (capture.width, capture.height);
        let (tx, rx) = flume::bounded(self.queue_size);
        let stop = Arc::new(AtomicBool::new(false));

        // Disconnects once the pump has dropped the capture
        let (exited_tx, exited_rx) = flume::bounded::<()>(0);

        let pump_stop = stop.clone();
        self.runtime
            .spawn_blocking(move || pump_frames(capture, tx, pump_stop, exited_tx));

        Ok(Box::new(V4l2Stream {
            rx: Some(rx),
            pump_exit: Some(exited_rx),
            stop_flag: stop,
            width,
            height,
        }))
    }
}

/// Open mmap capture on one device
struct V4l2Capture {
    device: Device,
    stream: Option<MmapStream<'static>>,
    format: PixelFormat,
    width: u32,
    height: u32,
    buffer_count: u32,
    sequence: u64,
}

impl V4l2Capture {
    fn open(found: &FoundDevice, request: &CaptureRequest, buffer_count: u32) -> Result<Self, CaptureError> {
        info!("Initializing V4L2 capture: {:?}", found);

        let device = Device::with_path(&found.path)?;

        let mut fmt = device.format()?;
        fmt.width = request.ideal_width;
        fmt.height = request.ideal_height;
        fmt.fourcc = utils::fourcc(found.format);

        // The driver answers with the closest mode it supports
        let actual = device.set_format(&fmt)?;
        let format = utils::pixel_format(actual.fourcc).ok_or_else(|| {
            CaptureError::ConstraintUnsatisfiable(format!(
                "driver switched to unsupported format {}",
                actual.fourcc
            ))
        })?;
        if actual.width == 0 || actual.height == 0 {
            return Err(CaptureError::ConstraintUnsatisfiable(
                "driver reported an empty frame size".into(),
            ));
        }

        info!(
            "Negotiated {}x{} {:?} (ideal {}x{})",
            actual.width, actual.height, format, request.ideal_width, request.ideal_height
        );

        Ok(Self {
            device,
            stream: None,
            format,
            width: actual.width,
            height: actual.height,
            buffer_count,
            sequence: 0,
        })
    }

    /// Start streaming with memory-mapped buffers
    fn start_stream(&mut self) -> Result<(), CaptureError> {
        let mut stream = MmapStream::with_buffers(&self.device, Type::VideoCapture, self.buffer_count)?;
        stream.set_timeout(DEQUEUE_TIMEOUT);
        self.stream = Some(stream);
        info!("Capture stream started with {} buffers", self.buffer_count);
        Ok(())
    }

    /// Dequeue the next filled buffer, `TimedOut` after `DEQUEUE_TIMEOUT`
    fn capture_frame(&mut self) -> io::Result<RawFrame> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "stream not started"))?;

        let (buf, meta) = stream.next()?;
        let used = (meta.bytesused as usize).min(buf.len());
        let data = Bytes::copy_from_slice(&buf[..used]);

        self.sequence += 1;

        Ok(RawFrame {
            data,
            meta: FrameMetadata {
                sequence: self.sequence,
                width: self.width,
                height: self.height,
                format: self.format,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpAction {
    /// Nothing arrived yet; dequeue again
    Retry,
    /// Driver hiccup; back off briefly and count it
    Backoff,
    /// Device is gone or the stream is unusable
    Exit,
}

fn pump_error_action(err: &io::Error) -> PumpAction {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {
            return PumpAction::Retry
        }
        io::ErrorKind::NotConnected => return PumpAction::Exit,
        _ => {}
    }
    match err.raw_os_error() {
        Some(libc::ENODEV | libc::ENXIO | libc::EBADF | libc::ENOENT) => PumpAction::Exit,
        _ => PumpAction::Backoff,
    }
}

fn pump_frames(
    mut capture: V4l2Capture,
    tx: Sender<FrameBuffer>,
    stop: Arc<AtomicBool>,
    exited: Sender<()>,
) {
    let mut failures = 0u32;

    while !stop.load(Ordering::Acquire) {
        let raw = match capture.capture_frame() {
            Ok(raw) => {
                failures = 0;
                raw
            }
            Err(e) => match pump_error_action(&e) {
                PumpAction::Retry => continue,
                PumpAction::Exit => {
                    error!("Capture device lost: {}", e);
                    break;
                }
                PumpAction::Backoff => {
                    failures += 1;
                    if failures >= MAX_CAPTURE_FAILURES {
                        error!("Giving up after {} capture errors: {}", failures, e);
                        break;
                    }
                    warn!("Capture error: {}", e);
                    std::thread::sleep(RETRY_BACKOFF);
                    continue;
                }
            },
        };

        let frame = match decode_frame(&raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping frame {}: {}", raw.meta.sequence, e);
                continue;
            }
        };
        metrics::counter!("frames_decoded").increment(1);

        match tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => metrics::counter!("frames_dropped").increment(1),
            Err(TrySendError::Disconnected(_)) => break,
        }
    }

    let frames = capture.sequence;
    // Unmaps the buffers and closes the device before `stop` is released
    drop(capture);
    drop(exited);
    info!("Capture pump stopped after {} frames", frames);
}

/// Session-side handle of a running V4L2 capture
pub struct V4l2Stream {
    rx: Option<Receiver<FrameBuffer>>,
    /// Never carries a value; disconnects when the pump has exited
    pump_exit: Option<Receiver<()>>,
    stop_flag: Arc<AtomicBool>,
    width: u32,
    height: u32,
}

impl LiveStream for V4l2Stream {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn poll_frame(&mut self) -> Option<FrameBuffer> {
        let rx = self.rx.as_ref()?;
        let mut latest = None;
        for frame in rx.try_iter() {
            if latest.replace(frame).is_some() {
                metrics::counter!("frames_dropped").increment(1);
            }
        }
        latest
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        self.rx = None;

        let Some(exit) = self.pump_exit.take() else {
            return;
        };
        match exit.recv_timeout(PUMP_EXIT_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => info!("V4L2 stream released"),
            Err(RecvTimeoutError::Timeout) => {
                warn!("Capture pump still running after {:?}", PUMP_EXIT_TIMEOUT)
            }
        }
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}
