//! Playlist entries pairing segments with selected exercises.

use serde::{Deserialize, Serialize};

use crate::catalog::Exercise;
use crate::segment::Segment;

/// One matched segment: the segment, its duration, and the exercise
/// selected for it. Entries appear in segment temporal order; segments
/// that could not be matched simply have no entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub segment: Segment,
    /// Seconds of exercise media this entry must fill. Always equals
    /// `segment.duration()`.
    pub duration: f64,
    pub exercise: Exercise,
}

impl PlaylistEntry {
    pub fn new(segment: Segment, exercise: Exercise) -> Self {
        let duration = segment.duration();
        Self {
            segment,
            duration,
            exercise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentLabel;

    #[test]
    fn test_duration_follows_segment() {
        let entry = PlaylistEntry::new(
            Segment::new(SegmentLabel::Warmup, 0.0, 42.5),
            Exercise {
                name: "march".to_string(),
                media_url: "https://cdn.example.com/march.mp4".to_string(),
                narration_text: String::new(),
            },
        );
        assert!((entry.duration - 42.5).abs() < f64::EPSILON);
    }
}
