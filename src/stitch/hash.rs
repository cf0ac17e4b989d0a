//! Row fingerprinting — compact, noise-tolerant signatures for pixel rows.
//!
//! Each row gets two representations: an exact seeded hash over the raw
//! bytes, and a coarse 32-bin intensity profile. The exact hash catches
//! byte-identical rows cheaply; the profile lets rows that differ only by
//! sub-pixel rendering jitter (text anti-aliasing, compositor dithering)
//! still count as matching.

use crate::frame::FrameBuffer;
use ahash::RandomState;
use std::hash::{BuildHasher, Hasher};

/// Number of bins in the approximate intensity profile.
pub const APPROX_BINS: usize = 32;

// Fixed seeds so fingerprints are reproducible across runs and processes.
const HASH_SEEDS: (u64, u64, u64, u64) = (
    0x7363_726f_6c6c,
    0x7374_6974_6368,
    0x726f_7768_6173,
    0x6669_6e67_6572,
);

/// Compact signature of one pixel row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowFingerprint {
    pub row: u32,
    exact: u64,
    approx: [u8; APPROX_BINS],
}

impl RowFingerprint {
    /// True when the rows are byte-identical, or close enough that every
    /// profile bin differs by at most `noise_tolerance`.
    pub fn matches(&self, other: &Self, noise_tolerance: u8) -> bool {
        self.exact == other.exact || self.approx_matches(other, noise_tolerance)
    }

    fn approx_matches(&self, other: &Self, tolerance: u8) -> bool {
        self.approx
            .iter()
            .zip(other.approx.iter())
            .all(|(a, b)| a.abs_diff(*b) <= tolerance)
    }

    #[cfg(test)]
    pub(crate) fn exact_digest(&self) -> u64 {
        self.exact
    }
}

/// Fingerprints every row of a frame.
///
/// Pure and deterministic: identical pixel input always yields identical
/// fingerprints, so frames may be fingerprinted independently in any order.
pub fn fingerprint(frame: &FrameBuffer) -> Vec<RowFingerprint> {
    let width = frame.width();
    (0..frame.height())
        .map(|y| fingerprint_row(y, frame.row(y), width))
        .collect()
}

fn fingerprint_row(row: u32, bytes: &[u8], width: u32) -> RowFingerprint {
    let state = RandomState::with_seeds(HASH_SEEDS.0, HASH_SEEDS.1, HASH_SEEDS.2, HASH_SEEDS.3);
    let mut hasher = state.build_hasher();
    hasher.write(bytes);
    RowFingerprint {
        row,
        exact: hasher.finish(),
        approx: intensity_profile(bytes, width),
    }
}

/// Mean R+G+B intensity over each of `APPROX_BINS` horizontal spans of the
/// row. Alpha is ignored; capture sources report it as opaque anyway.
fn intensity_profile(bytes: &[u8], width: u32) -> [u8; APPROX_BINS] {
    let mut profile = [0u8; APPROX_BINS];
    let width = width as usize;
    if width == 0 {
        return profile;
    }
    for (bin, slot) in profile.iter_mut().enumerate() {
        let start = bin * width / APPROX_BINS;
        let end = (bin + 1) * width / APPROX_BINS;
        if start >= end {
            // Rows narrower than the bin count leave trailing bins empty.
            continue;
        }
        let mut sum = 0u32;
        for x in start..end {
            let px = &bytes[x * 4..x * 4 + 3];
            sum += px[0] as u32 + px[1] as u32 + px[2] as u32;
        }
        *slot = (sum / (3 * (end - start) as u32)) as u8;
    }
    profile
}
