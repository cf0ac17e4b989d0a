//! End-to-end state machine tests driven by a scripted frame source and a
//! virtual clock. No screen, no sleeping.

use image::{Rgba, RgbaImage};
use scrollstitch::{
    begin_capture_with_source, AbortReason, CanvasProgress, CaptureSession, Clock, FrameSource,
    SessionConfig, SessionEvent, SessionState,
};
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const WIDTH: u32 = 64;

/// A tall synthetic document; row `y` has a distinctive intensity so
/// alignment is unambiguous.
fn document(height: u32) -> Vec<u8> {
    (0..height).map(|y| ((y * 37) % 251) as u8).collect()
}

/// One viewport-sized frame of the document starting at `top`.
fn doc_frame(doc: &[u8], top: u32, height: u32) -> RgbaImage {
    let mut pixels = RgbaImage::new(WIDTH, height);
    for y in 0..height {
        let v = doc[(top + y) as usize];
        for x in 0..WIDTH {
            pixels.put_pixel(x, y, Rgba([v, v, v, 255]));
        }
    }
    pixels
}

/// A frame unrelated to the document.
fn unrelated_frame(height: u32) -> RgbaImage {
    let mut pixels = RgbaImage::new(WIDTH, height);
    for y in 0..height {
        for x in 0..WIDTH {
            pixels.put_pixel(x, y, Rgba([250, 250, 250, 255]));
        }
    }
    pixels
}

enum Step {
    Frame(RgbaImage),
    Error(&'static str),
}

/// Yields scripted steps; afterwards either repeats the last frame forever
/// (the user stopped scrolling) or reports exhaustion.
struct ScriptedSource {
    steps: VecDeque<Step>,
    repeat_last: bool,
    last: Option<RgbaImage>,
}

impl ScriptedSource {
    fn new(frames: Vec<RgbaImage>, repeat_last: bool) -> Self {
        Self {
            steps: frames.into_iter().map(Step::Frame).collect(),
            repeat_last,
            last: None,
        }
    }

    fn with_steps(steps: Vec<Step>, repeat_last: bool) -> Self {
        Self {
            steps: steps.into(),
            repeat_last,
            last: None,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self, _timeout: Duration) -> scrollstitch::Result<Option<RgbaImage>> {
        match self.steps.pop_front() {
            Some(Step::Frame(frame)) => {
                self.last = Some(frame.clone());
                Ok(Some(frame))
            }
            Some(Step::Error(msg)) => Err(scrollstitch::Error::Source(msg.into())),
            None if self.repeat_last => Ok(self.last.clone()),
            None => Ok(None),
        }
    }
}

/// Virtual clock; only `sleep` advances time.
struct TestClock {
    now: Cell<Instant>,
}

impl TestClock {
    fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

fn run_session<S>(source: S, config: SessionConfig) -> (SessionEvent, SessionState)
where
    S: FrameSource + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let progress = Arc::new(CanvasProgress::default());
    let mut session = CaptureSession::new(config, stop, progress);
    let clock = TestClock::new();
    let event = session.run(source, &clock);
    (event, session.state())
}

#[test]
fn stall_timeout_completes_the_stitched_document() {
    let doc = document(200);
    // Frames 2-4 each reveal 20 new rows, frame 5 onward duplicates.
    let frames = vec![
        doc_frame(&doc, 0, 100),
        doc_frame(&doc, 20, 100),
        doc_frame(&doc, 40, 100),
        doc_frame(&doc, 60, 100),
        doc_frame(&doc, 60, 100),
    ];
    let source = ScriptedSource::new(frames, true);

    let (event, state) = run_session(source, SessionConfig::default());

    assert_eq!(state, SessionState::Done);
    let image = match event {
        SessionEvent::Completed(image) => image,
        SessionEvent::Failed(reason) => panic!("expected completion, got {reason}"),
    };
    assert_eq!(image.dimensions(), (WIDTH, 160));
    // Every stitched row must land exactly where the document has it.
    for y in 0..160 {
        let v = doc[y as usize];
        assert_eq!(image.get_pixel(0, y).0, [v, v, v, 255], "row {y}");
    }
}

#[test]
fn explicit_stop_completes_without_waiting_for_stall() {
    // Stall timeout far beyond what the virtual clock will ever reach.
    let config = SessionConfig {
        stall_timeout_ms: 600_000,
        ..SessionConfig::default()
    };

    struct StopAfter {
        inner: ScriptedSource,
        yielded: u32,
        stop: Arc<AtomicBool>,
    }

    impl FrameSource for StopAfter {
        fn next_frame(&mut self, timeout: Duration) -> scrollstitch::Result<Option<RgbaImage>> {
            self.yielded += 1;
            if self.yielded > 3 {
                self.stop.store(true, Ordering::SeqCst);
            }
            self.inner.next_frame(timeout)
        }
    }

    let doc = document(100);
    let stop = Arc::new(AtomicBool::new(false));
    let progress = Arc::new(CanvasProgress::default());
    let mut session = CaptureSession::new(config, Arc::clone(&stop), progress);
    let source = StopAfter {
        inner: ScriptedSource::new(vec![doc_frame(&doc, 0, 100)], true),
        yielded: 0,
        stop,
    };
    let clock = TestClock::new();
    let start = clock.now();

    let event = session.run(source, &clock);

    assert_eq!(session.state(), SessionState::Done);
    match event {
        SessionEvent::Completed(image) => assert_eq!(image.height(), 100),
        SessionEvent::Failed(reason) => panic!("expected completion, got {reason}"),
    }
    // Stop was observed within one sampling interval of being requested.
    let interval = SessionConfig::default().sampling_interval();
    assert!(clock.now() - start <= interval * 5);
}

#[test]
fn repeated_mismatch_aborts() {
    let doc = document(100);
    let frames = vec![
        doc_frame(&doc, 0, 100),
        unrelated_frame(100),
        unrelated_frame(100),
        unrelated_frame(100),
    ];
    let source = ScriptedSource::new(frames, true);

    let (event, state) = run_session(source, SessionConfig::default());

    assert_eq!(state, SessionState::Aborted);
    assert!(matches!(
        event,
        SessionEvent::Failed(AbortReason::RepeatedMismatch { failures: 3 })
    ));
}

#[test]
fn duplicate_frames_reset_the_mismatch_streak() {
    let doc = document(100);
    let frames = vec![
        doc_frame(&doc, 0, 100),
        unrelated_frame(100),
        unrelated_frame(100),
        doc_frame(&doc, 0, 100), // duplicate, clears the streak
        unrelated_frame(100),
        unrelated_frame(100),
        doc_frame(&doc, 0, 100),
    ];
    let source = ScriptedSource::new(frames, true);

    let (event, state) = run_session(source, SessionConfig::default());

    assert_eq!(state, SessionState::Done);
    assert!(matches!(event, SessionEvent::Completed(_)));
}

#[test]
fn source_error_aborts_with_source_failure() {
    let doc = document(100);
    let source = ScriptedSource::with_steps(
        vec![
            Step::Frame(doc_frame(&doc, 0, 100)),
            Step::Error("virtual capture device unplugged"),
        ],
        false,
    );

    let (event, state) = run_session(source, SessionConfig::default());

    assert_eq!(state, SessionState::Aborted);
    match event {
        SessionEvent::Failed(AbortReason::SourceFailure(msg)) => {
            assert!(msg.contains("unplugged"));
        }
        other => panic!("expected source failure, got {other:?}"),
    }
}

#[test]
fn unresponsive_source_aborts_within_timeout() {
    // A backend that blocks inside next_frame and ignores the timeout it
    // was handed must not hang the session.
    struct StuckSource;

    impl FrameSource for StuckSource {
        fn next_frame(&mut self, _timeout: Duration) -> scrollstitch::Result<Option<RgbaImage>> {
            std::thread::sleep(Duration::from_secs(30));
            Ok(None)
        }
    }

    let config = SessionConfig {
        source_timeout_ms: 50,
        ..SessionConfig::default()
    };
    let started = Instant::now();
    let (event, state) = run_session(StuckSource, config);

    assert!(
        started.elapsed() < Duration::from_secs(5),
        "session should give up on the pull, not wait out the source"
    );
    assert_eq!(state, SessionState::Aborted);
    match event {
        SessionEvent::Failed(AbortReason::SourceFailure(msg)) => {
            assert!(msg.contains("no frame from the source"));
        }
        other => panic!("expected source failure, got {other:?}"),
    }
}

#[test]
fn canvas_ceiling_aborts() {
    let config = SessionConfig {
        max_canvas_height: 180,
        ..SessionConfig::default()
    };
    let doc = document(400);
    let frames = vec![
        doc_frame(&doc, 0, 100),
        doc_frame(&doc, 50, 100),
        doc_frame(&doc, 100, 100),
        doc_frame(&doc, 150, 100),
    ];
    let source = ScriptedSource::new(frames, true);

    let (event, state) = run_session(source, config);

    assert_eq!(state, SessionState::Aborted);
    assert!(matches!(
        event,
        SessionEvent::Failed(AbortReason::SafetyCeilingExceeded { ceiling: 180 })
    ));
}

#[test]
fn exhausted_source_completes_with_what_it_has() {
    let doc = document(100);
    let source = ScriptedSource::new(vec![doc_frame(&doc, 0, 100)], false);

    let (event, state) = run_session(source, SessionConfig::default());

    assert_eq!(state, SessionState::Done);
    match event {
        SessionEvent::Completed(image) => assert_eq!(image.dimensions(), (WIDTH, 100)),
        SessionEvent::Failed(reason) => panic!("expected completion, got {reason}"),
    }
}

#[test]
fn session_with_no_frames_completes_empty() {
    let source = ScriptedSource::new(vec![], false);
    let (event, state) = run_session(source, SessionConfig::default());

    assert_eq!(state, SessionState::Done);
    match event {
        SessionEvent::Completed(image) => assert_eq!(image.dimensions(), (0, 0)),
        SessionEvent::Failed(reason) => panic!("expected completion, got {reason}"),
    }
}

#[test]
fn worker_thread_reports_through_the_handle() {
    // Real thread, real (tiny) durations; exercises the public surface.
    let config = SessionConfig {
        sampling_interval_ms: 2,
        stall_timeout_ms: 40,
        source_timeout_ms: 100,
        ..SessionConfig::default()
    };
    let doc = document(200);
    let frames = vec![
        doc_frame(&doc, 0, 100),
        doc_frame(&doc, 20, 100),
        doc_frame(&doc, 40, 100),
        doc_frame(&doc, 60, 100),
    ];
    let handle = begin_capture_with_source(ScriptedSource::new(frames, true), config);

    match handle.wait() {
        SessionEvent::Completed(image) => assert_eq!(image.dimensions(), (WIDTH, 160)),
        SessionEvent::Failed(reason) => panic!("expected completion, got {reason}"),
    }
}

#[test]
fn request_stop_is_observed_by_the_worker() {
    let config = SessionConfig {
        sampling_interval_ms: 2,
        stall_timeout_ms: 600_000,
        ..SessionConfig::default()
    };
    let doc = document(100);
    let handle =
        begin_capture_with_source(ScriptedSource::new(vec![doc_frame(&doc, 0, 100)], true), config);

    std::thread::sleep(Duration::from_millis(20));
    handle.request_stop();
    handle.request_stop(); // idempotent

    match handle.wait() {
        SessionEvent::Completed(image) => {
            assert_eq!(image.dimensions(), (WIDTH, 100));
        }
        SessionEvent::Failed(reason) => panic!("expected completion, got {reason}"),
    }
}
