//! Stitching core — row fingerprints, overlap alignment, canvas assembly.
//!
//! Everything here is pure CPU work over in-memory pixels; nothing in this
//! module touches the screen or the clock.

mod canvas;
mod hash;
mod matcher;

pub use canvas::{AppendOutcome, CanvasAssembler, CanvasProgress};
pub use hash::{fingerprint, RowFingerprint, APPROX_BINS};
pub use matcher::{align, Alignment};
