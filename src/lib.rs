//! scrollstitch — scrolling-screenshot capture engine.
//!
//! Samples a rectangular screen region at a fixed cadence while the user
//! scrolls its contents, aligns every new frame against the bottom of what
//! has already been captured, and appends only the newly revealed rows.
//! The result is one seamless, duplicate-free image of the whole scrolled
//! content. The session finishes on its own once no new rows have appeared
//! for a while, or immediately on an explicit stop request.
//!
//! The live pieces (monitor enumeration, pixel grabbing) sit behind the
//! [`FrameSource`] trait; everything else is deterministic, CPU-bound, and
//! testable without a screen.
//!
//! ```no_run
//! use scrollstitch::{begin_capture, export, Region, SessionConfig, SessionEvent};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let region = Region::new(100, 100, 800, 600)?;
//! let handle = begin_capture(region, SessionConfig::default());
//! // ...user scrolls; the session stops once content stops growing...
//! match handle.wait() {
//!     SessionEvent::Completed(image) => {
//!         export::save_png(&image, std::path::Path::new("scroll.png"))?;
//!     }
//!     SessionEvent::Failed(reason) => eprintln!("capture failed: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod frame;
pub mod session;
pub mod stitch;

pub use config::{MatchConfig, SessionConfig};
pub use error::{AbortReason, Error, Result};
pub use frame::{FrameBuffer, Region};
pub use session::{
    begin_capture, begin_capture_with_source, CaptureSession, Clock, FrameSource,
    ScreenRegionSource, SessionEvent, SessionHandle, SessionState, SystemClock,
};
pub use stitch::{
    align, fingerprint, Alignment, AppendOutcome, CanvasAssembler, CanvasProgress, RowFingerprint,
};
