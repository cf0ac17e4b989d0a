//! Frame sources — where sampled pixels come from.
//!
//! The live implementation talks to the OS through `xcap`. Everything else
//! in the crate only sees the [`FrameSource`] trait, so tests and embedders
//! can feed frames from anywhere.

use crate::error::{Error, Result};
use crate::frame::Region;
use image::RgbaImage;
use std::time::{Duration, Instant};
use xcap::Monitor;

/// Supplies one frame of the capture region per sampling tick.
pub trait FrameSource {
    /// Returns the next frame, `Ok(None)` once the source has nothing more
    /// to give, or an error on capture failure. `timeout` bounds how long
    /// the call may block.
    fn next_frame(&mut self, timeout: Duration) -> Result<Option<RgbaImage>>;
}

/// Wall-clock abstraction so the recording loop can run against a virtual
/// clock in tests.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Live source: captures whichever monitor contains the region's center and
/// crops to the region.
pub struct ScreenRegionSource {
    region: Region,
}

impl ScreenRegionSource {
    pub fn new(region: Region) -> Self {
        Self { region }
    }
}

impl FrameSource for ScreenRegionSource {
    fn next_frame(&mut self, _timeout: Duration) -> Result<Option<RgbaImage>> {
        capture_region(&self.region).map(Some)
    }
}

fn capture_region(region: &Region) -> Result<RgbaImage> {
    let monitors = Monitor::all()
        .map_err(|e| Error::Source(format!("failed to enumerate monitors: {e}")))?;

    // Region coordinates are global physical pixels; resolve the monitor
    // the same way the overlay did, by the region's center point.
    let (cx, cy) = region.center();
    let monitor = monitors
        .iter()
        .find(|m| monitor_contains(m, cx, cy))
        .or_else(|| monitors.first())
        .ok_or_else(|| Error::Source("no monitor found".into()))?;

    let image = monitor
        .capture_image()
        .map_err(|e| Error::Source(format!("screen capture failed: {e}")))?;

    let rx = (region.x - monitor.x().unwrap_or(0)).max(0) as u32;
    let ry = (region.y - monitor.y().unwrap_or(0)).max(0) as u32;
    if rx + region.width > image.width() || ry + region.height > image.height() {
        return Err(Error::Source(format!(
            "region {}x{} at ({rx},{ry}) exceeds monitor image {}x{}",
            region.width,
            region.height,
            image.width(),
            image.height()
        )));
    }

    Ok(image::imageops::crop_imm(&image, rx, ry, region.width, region.height).to_image())
}

fn monitor_contains(monitor: &Monitor, px: i32, py: i32) -> bool {
    let (Ok(x), Ok(y), Ok(w), Ok(h)) = (
        monitor.x(),
        monitor.y(),
        monitor.width(),
        monitor.height(),
    ) else {
        return false;
    };
    px >= x && px < x + w as i32 && py >= y && py < y + h as i32
}
