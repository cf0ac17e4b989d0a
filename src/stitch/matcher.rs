//! Vertical overlap alignment between the canvas tail and an incoming frame.

use crate::config::MatchConfig;
use crate::stitch::hash::RowFingerprint;

/// Outcome of aligning a candidate frame against the canvas tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// No prefix of the candidate lines up with the tail at all.
    NoOverlap,
    /// The candidate repeats the tail; there is nothing new to append.
    FullDuplicate,
    /// The candidate has scrolled `offset_rows` past the tail; its bottom
    /// `new_rows` rows are new content. The two are equal except for the
    /// first frame of a session, where the whole frame is new.
    Partial { offset_rows: u32, new_rows: u32 },
}

/// Finds the scroll offset between `tail` (fingerprints of the last accepted
/// frame) and `candidate` (fingerprints of the incoming frame).
///
/// Offsets are tried smallest first: small genuine scrolls are vastly more
/// likely than large spurious matches, and a false accept at a large offset
/// would silently skip real content. An offset is accepted when the matched
/// fraction of the compared span reaches `config.match_threshold`, with
/// spans shorter than `config.min_overlap_rows` never trusted.
pub fn align(
    tail: &[RowFingerprint],
    candidate: &[RowFingerprint],
    config: &MatchConfig,
) -> Alignment {
    let height = candidate.len();
    if height == 0 {
        return Alignment::FullDuplicate;
    }
    if tail.is_empty() {
        // First frame of the session; everything is new.
        return Alignment::Partial {
            offset_rows: 0,
            new_rows: height as u32,
        };
    }

    // Offset 0 first: if the frame matches the tail in place, the user has
    // not scrolled (or has hit the end of the content). Checking this before
    // the scrolled offsets keeps frames of repetitive content (a blank
    // region pattern-matches itself at every offset) from growing the
    // canvas forever.
    let span = height.min(tail.len());
    if span_matches(&tail[tail.len() - span..], &candidate[..span], config) {
        return Alignment::FullDuplicate;
    }

    for offset in 1..height {
        let span = (height - offset).min(tail.len());
        if span < config.min_overlap_rows.max(1) as usize {
            // Spans only shrink as the offset grows.
            break;
        }
        if span_matches(&tail[tail.len() - span..], &candidate[..span], config) {
            log::debug!("overlap at offset {offset} over {span} compared rows");
            return Alignment::Partial {
                offset_rows: offset as u32,
                new_rows: offset as u32,
            };
        }
    }

    Alignment::NoOverlap
}

fn span_matches(tail: &[RowFingerprint], head: &[RowFingerprint], config: &MatchConfig) -> bool {
    debug_assert_eq!(tail.len(), head.len());
    if tail.is_empty() {
        return false;
    }
    let matched = tail
        .iter()
        .zip(head.iter())
        .filter(|(a, b)| a.matches(b, config.noise_tolerance))
        .count();
    matched as f32 >= config.match_threshold * tail.len() as f32
}
