use mirrorcam::capture::{CaptureError, CaptureRequest, FrameBuffer, FrameFeed, SyntheticBackend};
use mirrorcam::display::{present, SurfaceOptions, VisibleSurface};
use mirrorcam::filter::{sobel_magnitude, FilterMode};
use mirrorcam::session::{handle_command, Command, CommandOutcome, Session};

fn checker(width: u32, height: u32) -> FrameBuffer {
    let mut frame = FrameBuffer::blank(width, height);
    for y in 0..height {
        for x in 0..width {
            let v = if (x + y) % 2 == 0 { 200 } else { 20 };
            frame.set_pixel(x, y, [v, v / 2, v / 4, 255]);
        }
    }
    frame
}

fn running_session(width: u32, height: u32) -> (Session, SyntheticBackend, FrameFeed) {
    let (backend, feed) = SyntheticBackend::scripted(width, height);
    let mut session = Session::new(CaptureRequest::default(), SurfaceOptions::default());
    assert_eq!(
        handle_command(&mut session, &backend, Command::Start),
        CommandOutcome::Applied
    );
    (session, backend, feed)
}

#[test]
fn passthrough_and_blur_render_the_captured_frame_verbatim() {
    let (mut session, backend, feed) = running_session(6, 5);
    let frame = checker(6, 5);

    for mode in [FilterMode::Passthrough, FilterMode::Blur] {
        handle_command(&mut session, &backend, Command::SetFilter(mode));
        feed.send(frame.clone()).unwrap();
        let rendered = session.tick().unwrap();
        assert_eq!(rendered.pixels, frame, "{mode:?}");
        assert_eq!(rendered.surface.visible, VisibleSurface::Preview);
    }
}

#[test]
fn white_through_grayscale_stays_white_and_is_mirrored_on_screen() {
    let (mut session, backend, feed) = running_session(4, 4);
    handle_command(&mut session, &backend, Command::SetFilter(FilterMode::Grayscale));

    let white = FrameBuffer::filled(4, 4, [255, 255, 255, 255]);
    feed.send(white.clone()).unwrap();
    let rendered = session.tick().unwrap();
    assert_eq!(rendered.pixels, white);
    assert!(rendered.surface.mirrored);
    assert_eq!(present(&rendered.pixels, &rendered.surface), white);
}

#[test]
fn black_through_edge_detect() {
    let (mut session, backend, feed) = running_session(4, 4);
    handle_command(&mut session, &backend, Command::SetFilter(FilterMode::EdgeDetect));

    feed.send(FrameBuffer::filled(4, 4, [0, 0, 0, 255])).unwrap();
    let out = session.tick().unwrap().pixels;
    for y in 0..4 {
        for x in 0..4 {
            let interior = (1..3).contains(&x) && (1..3).contains(&y);
            let expected = if interior { [0, 0, 0, 255] } else { [0, 0, 0, 0] };
            assert_eq!(out.pixel(x, y), expected, "({x},{y})");
        }
    }
}

#[test]
fn edge_detect_interior_matches_kernel() {
    let (mut session, backend, feed) = running_session(6, 5);
    handle_command(&mut session, &backend, Command::SetFilter(FilterMode::EdgeDetect));

    let mut frame = FrameBuffer::blank(6, 5);
    for y in 0..5 {
        for x in 0..6 {
            frame.set_pixel(x, y, [(x * 9 + y * 5) as u8, 0, 0, 255]);
        }
    }
    feed.send(frame.clone()).unwrap();
    let out = session.tick().unwrap().pixels;

    // On a linear ramp every interior pixel sees gx = 4 * 18 and gy = 4 * 10
    let expected = ((72.0f64 * 72.0) + (40.0 * 40.0)).sqrt();
    for y in 1..4 {
        for x in 1..5 {
            assert_eq!(sobel_magnitude(&frame, x, y), expected);
            assert_eq!(out.pixel(x, y), [82, 82, 82, 255]);
        }
    }
}

#[test]
fn mode_change_applies_on_next_tick() {
    let (mut session, backend, feed) = running_session(3, 3);
    let frame = checker(3, 3);

    feed.send(frame.clone()).unwrap();
    assert_eq!(session.tick().unwrap().pixels, frame);

    handle_command(&mut session, &backend, Command::SetFilter(FilterMode::Sepia));
    feed.send(frame.clone()).unwrap();
    let sepia = session.tick().unwrap();
    assert_ne!(sepia.pixels, frame);
    assert_eq!(sepia.surface.visible, VisibleSurface::Processed);
}

#[test]
fn full_lifecycle_with_failure_and_retry() {
    let mut session = Session::new(CaptureRequest::default(), SurfaceOptions::default());

    let denied = SyntheticBackend::failing(CaptureError::PermissionDenied("blocked".into()));
    assert!(matches!(
        handle_command(&mut session, &denied, Command::Start),
        CommandOutcome::Failed(_)
    ));
    assert!(session.enablement().start);
    assert!(session.tick().is_none());

    let camera = SyntheticBackend::pattern(16, 8);
    let stats = camera.stats();
    assert_eq!(
        handle_command(&mut session, &camera, Command::Start),
        CommandOutcome::Applied
    );
    assert_eq!(session.tick().unwrap().pixels.dimensions(), (16, 8));

    assert_eq!(
        handle_command(&mut session, &camera, Command::Stop),
        CommandOutcome::Applied
    );
    assert_eq!(
        handle_command(&mut session, &camera, Command::Stop),
        CommandOutcome::Ignored
    );
    assert_eq!(stats.acquired(), 1);
    assert_eq!(stats.stopped(), 1);
}

#[test]
fn dropping_an_active_session_releases_the_stream() {
    let camera = SyntheticBackend::pattern(4, 4);
    let stats = camera.stats();
    {
        let mut session = Session::new(CaptureRequest::default(), SurfaceOptions::default());
        handle_command(&mut session, &camera, Command::Start);
    }
    assert_eq!(stats.stopped(), 1);
}
