//! Error types for scrollstitch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid capture region: {0}")]
    InvalidRegion(String),

    #[error("Frame source failed: {0}")]
    Source(String),

    #[error("Frame is {got}px wide but the canvas is {expected}px wide")]
    FrameWidthMismatch { got: u32, expected: u32 },

    #[error("Canvas already finalized")]
    AlreadyFinalized,

    #[error("PNG encoding failed: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a capture session aborted instead of completing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortReason {
    #[error("Frame source failed: {0}")]
    SourceFailure(String),

    #[error("Canvas reached the safety ceiling of {ceiling} rows")]
    SafetyCeilingExceeded { ceiling: u32 },

    #[error("{failures} consecutive frames shared no content with the canvas")]
    RepeatedMismatch { failures: u32 },
}
