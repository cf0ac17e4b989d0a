//! Frame-level data types — the capture region and individual sampled frames.

use crate::error::{Error, Result};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// An axis-aligned capture rectangle in physical pixel coordinates of the
/// target screen. Immutable once a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidRegion(format!(
                "region must have positive dimensions, got {width}x{height}"
            )));
        }
        Ok(Self { x, y, width, height })
    }

    /// Shrinks the region by `px` on every side, keeping at least one pixel
    /// in each dimension. Used to keep a selection overlay's border out of
    /// the captured output.
    pub fn inset(self, px: u32) -> Self {
        let width = self.width.saturating_sub(px * 2).max(1);
        let height = self.height.saturating_sub(px * 2).max(1);
        Self {
            x: self.x + px as i32,
            y: self.y + px as i32,
            width,
            height,
        }
    }

    /// Center point in global physical coordinates. Used to pick which
    /// monitor the region belongs to.
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }
}

/// One sampled screenshot of the capture region.
///
/// Frames are never mutated after creation. The sequence number is stamped
/// by the session from its own counter and increases monotonically within
/// a session.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub sequence: u64,
    pub captured_at: Instant,
    pub pixels: RgbaImage,
}

impl FrameBuffer {
    pub fn new(sequence: u64, captured_at: Instant, pixels: RgbaImage) -> Self {
        Self {
            sequence,
            captured_at,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Raw RGBA bytes of one pixel row.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.pixels.width() as usize * 4;
        let start = y as usize * stride;
        &self.pixels.as_raw()[start..start + stride]
    }
}
