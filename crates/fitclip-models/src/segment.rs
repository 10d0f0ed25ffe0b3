//! Track segments produced by structural analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::Category;

/// Structural role of a segment within the source track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentLabel {
    /// Opening span of the track (intro).
    Warmup,
    /// Main body of the track.
    Core,
    /// Closing span of the track (outro).
    Cooldown,
    /// Whole-track fallback emitted when structural analysis cannot find
    /// the expected boundaries. Carries no catalog category.
    FullTrack,
}

impl SegmentLabel {
    /// The catalog category this label maps to, if any.
    ///
    /// `FullTrack` maps to nothing; segments carrying it are skipped by
    /// the matcher with a warning rather than aborting the run.
    pub fn catalog_category(&self) -> Option<Category> {
        match self {
            SegmentLabel::Warmup => Some(Category::Warmup),
            SegmentLabel::Core => Some(Category::Core),
            SegmentLabel::Cooldown => Some(Category::Cooldown),
            SegmentLabel::FullTrack => None,
        }
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SegmentLabel::Warmup => "warmup",
            SegmentLabel::Core => "core",
            SegmentLabel::Cooldown => "cooldown",
            SegmentLabel::FullTrack => "full_track",
        };
        write!(f, "{}", s)
    }
}

/// A labeled, time-bounded span of the source track.
///
/// Segments are produced once by structural analysis and immutable
/// afterwards. A valid segment set is ordered, non-overlapping,
/// contiguous, and spans `[0, duration]` exactly, with
/// `start_time < end_time` for every member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub label: SegmentLabel,
    /// Start offset in seconds.
    pub start_time: f64,
    /// End offset in seconds (exclusive).
    pub end_time: f64,
}

impl Segment {
    pub fn new(label: SegmentLabel, start_time: f64, end_time: f64) -> Self {
        Self {
            label,
            start_time,
            end_time,
        }
    }

    /// Length of the span in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:.2}s - {:.2}s]",
            self.label, self.start_time, self.end_time
        )
    }
}
