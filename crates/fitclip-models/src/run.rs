//! Run identity and per-item warnings.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::catalog::Category;
use crate::difficulty::DifficultyTier;
use crate::segment::SegmentLabel;

/// Unique identifier for one pipeline run.
///
/// The id namespaces the run's temp-file workspace, so independent runs
/// may execute concurrently without colliding on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recoverable per-item condition recorded during a run.
///
/// Warnings never abort the run; they are accumulated and returned so
/// the caller can see which segments lost matched or composable content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// A segment's label maps to no catalog category; the segment was
    /// skipped during matching.
    UnmappedSegment { label: SegmentLabel },
    /// The catalog list for this category/tier exists but is empty.
    EmptyCategory {
        category: Category,
        tier: DifficultyTier,
    },
    /// Downloading the exercise media failed; the entry was dropped.
    AssetFetch { exercise: String, reason: String },
    /// Decoding or composing the fetched media failed; the entry was
    /// dropped.
    ClipDecode { exercise: String, reason: String },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::UnmappedSegment { label } => {
                write!(f, "segment '{}' has no catalog category, skipped", label)
            }
            RunWarning::EmptyCategory { category, tier } => {
                write!(f, "no '{}' exercises at tier '{}', segment skipped", category, tier)
            }
            RunWarning::AssetFetch { exercise, reason } => {
                write!(f, "fetch failed for '{}': {}", exercise, reason)
            }
            RunWarning::ClipDecode { exercise, reason } => {
                write!(f, "decode failed for '{}': {}", exercise, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn test_warning_display() {
        let warning = RunWarning::AssetFetch {
            exercise: "squat".to_string(),
            reason: "HTTP 404".to_string(),
        };
        assert_eq!(warning.to_string(), "fetch failed for 'squat': HTTP 404");
    }
}
