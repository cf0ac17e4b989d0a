//! The growing stitched canvas.

use crate::error::{Error, Result};
use crate::frame::FrameBuffer;
use crate::stitch::hash::RowFingerprint;
use crate::stitch::matcher::Alignment;
use image::RgbaImage;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// What applying an alignment did to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// This many new rows were appended.
    Appended(u32),
    /// Duplicate frame; nothing appended, no progress made.
    NoProgress,
    /// The frame shares nothing with the tail; nothing appended. The
    /// session decides whether to discard and retry or give up.
    Mismatch,
}

/// Lock-free growth snapshot for observers outside the worker thread.
///
/// Observers read these atomics only; pixel data is never touched outside
/// the thread driving the session.
#[derive(Debug, Default)]
pub struct CanvasProgress {
    total_height: AtomicU32,
    last_growth_unix_ms: AtomicU64,
}

impl CanvasProgress {
    pub fn total_height(&self) -> u32 {
        self.total_height.load(Ordering::Relaxed)
    }

    /// Unix timestamp (ms) of the last accepted row growth, 0 before any.
    pub fn last_growth_unix_ms(&self) -> u64 {
        self.last_growth_unix_ms.load(Ordering::Relaxed)
    }

    pub(crate) fn record(&self, height: u32) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.total_height.store(height, Ordering::Relaxed);
        self.last_growth_unix_ms.store(now_ms, Ordering::Relaxed);
    }
}

/// Owns the accumulating output image.
///
/// Height only ever grows; the canvas is frozen exactly once by
/// [`CanvasAssembler::finalize`] and rejects appends afterwards.
pub struct CanvasAssembler {
    width: u32,
    /// Raw RGBA bytes, always `total_height` whole rows of `width` pixels.
    rows: Vec<u8>,
    total_height: u32,
    /// Fingerprints of the last accepted frame; what the next frame is
    /// aligned against.
    tail: Vec<RowFingerprint>,
    finalized: Option<RgbaImage>,
}

impl CanvasAssembler {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            rows: Vec::new(),
            total_height: 0,
            tail: Vec::new(),
            finalized: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn total_height(&self) -> u32 {
        self.total_height
    }

    pub fn tail(&self) -> &[RowFingerprint] {
        &self.tail
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    /// Applies an alignment decision for `frame`.
    ///
    /// On `Partial` the bottom `new_rows` rows of the frame are appended and
    /// `fingerprints` (the frame's own) replace the stored tail, so the next
    /// comparison runs against the freshest content instead of accumulating
    /// drift against a stale frame. Duplicate and no-overlap alignments
    /// append nothing and only report the outcome.
    pub fn apply(
        &mut self,
        alignment: Alignment,
        frame: &FrameBuffer,
        fingerprints: Vec<RowFingerprint>,
    ) -> Result<AppendOutcome> {
        if self.finalized.is_some() {
            return Err(Error::AlreadyFinalized);
        }
        if frame.width() != self.width {
            return Err(Error::FrameWidthMismatch {
                got: frame.width(),
                expected: self.width,
            });
        }
        match alignment {
            Alignment::NoOverlap => Ok(AppendOutcome::Mismatch),
            Alignment::FullDuplicate => Ok(AppendOutcome::NoProgress),
            Alignment::Partial { new_rows, .. } => {
                let new_rows = new_rows.min(frame.height());
                if new_rows == 0 {
                    return Ok(AppendOutcome::NoProgress);
                }
                let first_new = frame.height() - new_rows;
                for y in first_new..frame.height() {
                    self.rows.extend_from_slice(frame.row(y));
                }
                self.total_height += new_rows;
                self.tail = fingerprints;
                Ok(AppendOutcome::Appended(new_rows))
            }
        }
    }

    /// Freezes the canvas. Idempotent: every call returns the same image.
    pub fn finalize(&mut self) -> &RgbaImage {
        let (width, height) = (self.width, self.total_height);
        let rows = &mut self.rows;
        self.finalized.get_or_insert_with(|| {
            let rows = std::mem::take(rows);
            // apply() only ever appends whole rows, so the length matches
            debug_assert_eq!(rows.len(), width as usize * height as usize * 4);
            RgbaImage::from_raw(width, height, rows)
                .unwrap_or_else(|| RgbaImage::new(width, height))
        })
    }

    /// Finalizes (if not already done) and hands the image off.
    pub fn into_image(mut self) -> RgbaImage {
        self.finalize();
        match self.finalized {
            Some(image) => image,
            // finalize always populates; an empty canvas if it somehow didn't
            None => RgbaImage::new(self.width, 0),
        }
    }
}
