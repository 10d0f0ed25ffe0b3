//! Catalog-driven exercise matching.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};

use fitclip_models::{Catalog, CatalogError, DifficultyTier, PlaylistEntry, RunWarning, Segment};

/// Maps segments to catalog exercises for a difficulty tier.
///
/// Selection is uniformly random from the eligible list via the
/// injected RNG; there is no repetition tracking, so the same exercise
/// can appear in several segments of one playlist. Seed the RNG to
/// make selection reproducible.
pub struct CatalogMatcher<'a> {
    catalog: &'a Catalog,
}

impl<'a> CatalogMatcher<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Build the playlist for `segments` at `difficulty`.
    ///
    /// The difficulty string resolves leniently, defaulting to low on
    /// anything unrecognized. Segments without a catalog category and
    /// segments whose exercise list is empty are skipped with a
    /// warning. A category or tier missing from the catalog structure
    /// aborts the whole match: that is a malformed catalog, not a
    /// per-item condition. Output preserves segment order.
    pub fn match_segments(
        &self,
        segments: &[Segment],
        difficulty: &str,
        rng: &mut StdRng,
        warnings: &mut Vec<RunWarning>,
    ) -> Result<Vec<PlaylistEntry>, CatalogError> {
        let tier = DifficultyTier::parse_lenient(difficulty);
        debug!(requested = difficulty, resolved = %tier, "difficulty resolved");

        let mut playlist = Vec::with_capacity(segments.len());
        for segment in segments {
            let Some(category) = segment.label.catalog_category() else {
                warn!(segment = %segment, "segment has no catalog category, skipping");
                warnings.push(RunWarning::UnmappedSegment {
                    label: segment.label,
                });
                continue;
            };

            let exercises = self.catalog.exercises(category, tier)?;
            if exercises.is_empty() {
                warn!(%category, %tier, "no exercises for category/tier, segment skipped");
                warnings.push(RunWarning::EmptyCategory { category, tier });
                continue;
            }

            let exercise = exercises[rng.random_range(0..exercises.len())].clone();
            debug!(segment = %segment, exercise = %exercise.name, "segment matched");
            playlist.push(PlaylistEntry::new(segment.clone(), exercise));
        }

        Ok(playlist)
    }
}
