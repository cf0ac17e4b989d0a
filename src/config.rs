//! Session tuning knobs.
//!
//! Noise tolerance, timing, and safety limits are policy rather than
//! structure, so they live in plain serializable structs that embedders
//! can persist alongside their own settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tolerances for the overlap matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Fraction of compared rows that must match before an offset is
    /// accepted. Range (0, 1].
    pub match_threshold: f32,
    /// Overlap spans shorter than this many rows are never trusted.
    /// Guards against repeated patterns (code lines, table borders)
    /// aligning at a bogus offset.
    pub min_overlap_rows: u32,
    /// Maximum per-bin intensity difference under which two rows still
    /// count as matching via their approximate fingerprints.
    pub noise_tolerance: u8,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.9,
            min_overlap_rows: 16,
            noise_tolerance: 8,
        }
    }
}

/// Everything a capture session needs beyond the region itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How often a frame is sampled, in milliseconds.
    pub sampling_interval_ms: u64,
    /// How long the session waits without row growth before it decides
    /// scrolling has stopped and finalizes on its own.
    pub stall_timeout_ms: u64,
    /// How long a single frame pull may block before the source is
    /// considered failed.
    pub source_timeout_ms: u64,
    /// Consecutive no-overlap frames tolerated before the session aborts.
    pub mismatch_budget: u32,
    /// Hard ceiling on stitched canvas height, in rows. Bounds memory
    /// against unbounded scrolling.
    pub max_canvas_height: u32,
    pub matching: MatchConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sampling_interval_ms: 300,
            stall_timeout_ms: 3000,
            source_timeout_ms: 2000,
            mismatch_budget: 3,
            max_canvas_height: 50_000,
            matching: MatchConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = SessionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sampling_interval_ms, config.sampling_interval_ms);
        assert_eq!(back.matching.min_overlap_rows, config.matching.min_overlap_rows);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"stall_timeout_ms": 5000}"#).unwrap();
        assert_eq!(config.stall_timeout(), Duration::from_millis(5000));
        assert_eq!(config.mismatch_budget, SessionConfig::default().mismatch_budget);
    }
}
