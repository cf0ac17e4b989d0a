//! Capture session orchestration — the recording state machine.
//!
//! One worker drives fingerprinting → alignment → assembly, one frame
//! fully processed before the next is requested, so no two frames are ever
//! compared against the canvas concurrently. The frame source itself runs
//! on a helper thread behind a pull channel: a backend that blocks forever
//! (permission prompt, compositor stall) strands that thread, not the
//! session, which gives up on the pull after `source_timeout`. The control
//! surface (stop flag, growth snapshot, terminal event) is the only thing
//! shared with other threads.

mod source;

pub use source::{Clock, FrameSource, ScreenRegionSource, SystemClock};

use crate::config::SessionConfig;
use crate::error::{AbortReason, Error};
use crate::frame::{FrameBuffer, Region};
use crate::stitch::{align, fingerprint, AppendOutcome, CanvasAssembler, CanvasProgress};
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Lifecycle of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Finalizing,
    Done,
    Aborted,
}

/// The single terminal event of a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// Recording finished; here is the stitched image.
    Completed(RgbaImage),
    /// Recording failed.
    Failed(AbortReason),
}

/// Control surface returned by [`begin_capture`].
///
/// Dropping the handle requests a stop and waits for the worker to wind
/// down, so a session never outlives its caller.
pub struct SessionHandle {
    stop: Arc<AtomicBool>,
    progress: Arc<CanvasProgress>,
    events: mpsc::Receiver<SessionEvent>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SessionHandle {
    /// Asks the session to finish with whatever it has stitched so far.
    /// Idempotent and best-effort; the worker notices within one sampling
    /// interval.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Canvas growth snapshot, readable any time without touching pixels.
    pub fn progress(&self) -> &CanvasProgress {
        &self.progress
    }

    /// Blocks until the terminal event.
    pub fn wait(mut self) -> SessionEvent {
        let event = self.events.recv().unwrap_or_else(|_| {
            SessionEvent::Failed(AbortReason::SourceFailure(
                "session worker vanished without reporting".into(),
            ))
        });
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        event
    }

    /// Non-blocking poll for the terminal event.
    pub fn try_wait(&self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Starts a live capture of `region` on a dedicated worker thread.
pub fn begin_capture(region: Region, config: SessionConfig) -> SessionHandle {
    begin_capture_with_source(ScreenRegionSource::new(region), config)
}

/// Starts a capture fed by an arbitrary frame source. This is the seam the
/// tests use, and what embedders with their own capture stack plug into.
pub fn begin_capture_with_source<S>(source: S, config: SessionConfig) -> SessionHandle
where
    S: FrameSource + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let progress = Arc::new(CanvasProgress::default());
    let (sender, events) = mpsc::channel();

    let worker_stop = Arc::clone(&stop);
    let worker_progress = Arc::clone(&progress);
    let worker = thread::spawn(move || {
        let mut session = CaptureSession::new(config, worker_stop, worker_progress);
        let event = session.run(source, &SystemClock);
        let _ = sender.send(event);
    });

    SessionHandle {
        stop,
        progress,
        events,
        worker: Some(worker),
    }
}

/// Runs the frame source on its own thread so the session can bound every
/// pull. Requests and frames travel over channels; exactly one request is
/// outstanding at a time, preserving frame ordering.
struct Sampler {
    requests: mpsc::Sender<Duration>,
    frames: mpsc::Receiver<crate::error::Result<Option<RgbaImage>>>,
}

impl Sampler {
    fn spawn<S>(mut source: S) -> Self
    where
        S: FrameSource + Send + 'static,
    {
        let (requests, request_rx) = mpsc::channel::<Duration>();
        let (frame_tx, frames) = mpsc::channel();
        // Deliberately not joined: a hung backend strands this thread, and
        // the session must be able to walk away from it. A healthy source
        // exits once the request sender is dropped.
        thread::spawn(move || {
            while let Ok(timeout) = request_rx.recv() {
                let result = source.next_frame(timeout);
                let finished = !matches!(result, Ok(Some(_)));
                if frame_tx.send(result).is_err() || finished {
                    break;
                }
            }
        });
        Self { requests, frames }
    }

    /// Pulls one frame, erroring out after `timeout` even when the backend
    /// ignores the timeout it was handed and blocks indefinitely.
    fn pull(&self, timeout: Duration) -> crate::error::Result<Option<RgbaImage>> {
        if self.requests.send(timeout).is_err() {
            return Err(Error::Source("frame sampler thread exited".into()));
        }
        match self.frames.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::Source(format!(
                "no frame from the source within {timeout:?}"
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Error::Source("frame sampler thread exited".into()))
            }
        }
    }
}

/// The recording state machine. Owned and driven by a single thread.
pub struct CaptureSession {
    config: SessionConfig,
    state: SessionState,
    stop: Arc<AtomicBool>,
    progress: Arc<CanvasProgress>,
    /// Created lazily on the first frame, which fixes the canvas width.
    canvas: Option<CanvasAssembler>,
    frame_seq: u64,
    mismatch_streak: u32,
}

impl CaptureSession {
    pub fn new(config: SessionConfig, stop: Arc<AtomicBool>, progress: Arc<CanvasProgress>) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            stop,
            progress,
            canvas: None,
            frame_seq: 0,
            mismatch_streak: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drives the session to its terminal event. Blocks the calling thread
    /// until the session finishes or aborts.
    pub fn run<S>(&mut self, source: S, clock: &dyn Clock) -> SessionEvent
    where
        S: FrameSource + Send + 'static,
    {
        let sampler = Sampler::spawn(source);
        self.state = SessionState::Recording;
        log::info!(
            "capture session started (interval {:?}, stall timeout {:?})",
            self.config.sampling_interval(),
            self.config.stall_timeout()
        );

        let mut stall_deadline = clock.now() + self.config.stall_timeout();

        loop {
            if self.stop.load(Ordering::SeqCst) {
                log::info!("stop requested; finalizing");
                break;
            }
            if clock.now() >= stall_deadline {
                log::info!(
                    "no new rows for {:?}; assuming scrolling stopped",
                    self.config.stall_timeout()
                );
                break;
            }

            let pixels = match sampler.pull(self.config.source_timeout()) {
                Ok(Some(pixels)) => pixels,
                Ok(None) => {
                    log::info!("frame source exhausted; finalizing");
                    break;
                }
                Err(e) => return self.abort(AbortReason::SourceFailure(e.to_string())),
            };
            let frame = self.stamp(pixels, clock);

            match self.ingest(&frame) {
                Ok(AppendOutcome::Appended(rows)) => {
                    self.mismatch_streak = 0;
                    let height = self.canvas_height();
                    self.progress.record(height);
                    log::debug!(
                        "frame {}: +{} rows, canvas now {} rows",
                        frame.sequence,
                        rows,
                        height
                    );
                    if height > self.config.max_canvas_height {
                        return self.abort(AbortReason::SafetyCeilingExceeded {
                            ceiling: self.config.max_canvas_height,
                        });
                    }
                    stall_deadline = clock.now() + self.config.stall_timeout();
                }
                Ok(AppendOutcome::NoProgress) => {
                    // Duplicate frames never reset the stall timer.
                    self.mismatch_streak = 0;
                    log::debug!("frame {}: duplicate", frame.sequence);
                }
                Ok(AppendOutcome::Mismatch) => {
                    self.mismatch_streak += 1;
                    log::warn!(
                        "frame {}: no overlap with canvas ({} consecutive)",
                        frame.sequence,
                        self.mismatch_streak
                    );
                    if self.mismatch_streak >= self.config.mismatch_budget {
                        return self.abort(AbortReason::RepeatedMismatch {
                            failures: self.mismatch_streak,
                        });
                    }
                }
                Err(e) => return self.abort(AbortReason::SourceFailure(e.to_string())),
            }

            clock.sleep(self.config.sampling_interval());
        }

        self.state = SessionState::Finalizing;
        let image = match self.canvas.take() {
            Some(canvas) => canvas.into_image(),
            // No frame ever arrived; an empty artifact, not an error.
            None => RgbaImage::new(0, 0),
        };
        self.state = SessionState::Done;
        log::info!(
            "capture complete: {}x{} stitched image",
            image.width(),
            image.height()
        );
        SessionEvent::Completed(image)
    }

    fn stamp(&mut self, pixels: RgbaImage, clock: &dyn Clock) -> FrameBuffer {
        let sequence = self.frame_seq;
        self.frame_seq += 1;
        FrameBuffer::new(sequence, clock.now(), pixels)
    }

    fn ingest(&mut self, frame: &FrameBuffer) -> crate::error::Result<AppendOutcome> {
        let prints = fingerprint(frame);
        let canvas = self
            .canvas
            .get_or_insert_with(|| CanvasAssembler::new(frame.width()));
        let alignment = align(canvas.tail(), &prints, &self.config.matching);
        canvas.apply(alignment, frame, prints)
    }

    fn canvas_height(&self) -> u32 {
        self.canvas.as_ref().map_or(0, CanvasAssembler::total_height)
    }

    fn abort(&mut self, reason: AbortReason) -> SessionEvent {
        self.state = SessionState::Aborted;
        log::error!("capture aborted: {reason}");
        SessionEvent::Failed(reason)
    }
}
