//! Segmentation strategies and the engine facade.

use tracing::{debug, info};

use fitclip_models::{Segment, SegmentLabel};

use crate::beat::detect_beats;
use crate::error::{AnalysisError, AnalysisResult};

/// Fewer detected beats than this means degenerate rhythm; boundary
/// snapping is skipped in favor of pure proportional division.
pub const MIN_BEATS_FOR_SNAP: usize = 5;

/// A snapped intro boundary below this reverts to the proportional
/// target.
const MIN_INTRO_SECS: f64 = 1.0;

/// A segmentation strategy partitions a decoded mono waveform into an
/// ordered, contiguous, labeled set of segments spanning the full track.
pub trait SegmentationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Segment the waveform. Never returns a partial result: any decode
    /// or feature-extraction failure is a fatal error.
    fn segment(&self, samples: &[f32], sample_rate: u32) -> AnalysisResult<Vec<Segment>>;
}

/// Facade holding the selected strategy.
pub struct SegmentationEngine {
    strategy: Box<dyn SegmentationStrategy>,
}

impl SegmentationEngine {
    pub fn new(strategy: Box<dyn SegmentationStrategy>) -> Self {
        Self { strategy }
    }

    /// Engine with the default beat-snapped proportional strategy.
    pub fn with_default_strategy() -> Self {
        Self::new(Box::new(BeatSnapSegmenter))
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn segment(&self, samples: &[f32], sample_rate: u32) -> AnalysisResult<Vec<Segment>> {
        let segments = self.strategy.segment(samples, sample_rate)?;
        debug_assert!(is_contiguous(&segments), "strategy produced a gap or overlap");
        info!(
            strategy = self.strategy.name(),
            segments = segments.len(),
            "segmentation complete"
        );
        Ok(segments)
    }
}

fn is_contiguous(segments: &[Segment]) -> bool {
    segments.windows(2).all(|w| w[0].end_time == w[1].start_time)
        && segments.iter().all(|s| s.start_time < s.end_time)
}

/// Default strategy: proportional boundary targets snapped to the
/// nearest detected beat.
///
/// The track is divided intro/main/outro at 1/5 and 4/5 of its duration.
/// With a usable beat grid each target moves to the closest beat; two
/// clamps keep the result sane (the intro must reach one second, the
/// main boundary must lie beyond the intro). Degenerate rhythm falls
/// back to the untouched proportional targets.
pub struct BeatSnapSegmenter;

impl SegmentationStrategy for BeatSnapSegmenter {
    fn name(&self) -> &'static str {
        "beat_snap"
    }

    fn segment(&self, samples: &[f32], sample_rate: u32) -> AnalysisResult<Vec<Segment>> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate(sample_rate));
        }
        if samples.is_empty() {
            return Err(AnalysisError::EmptySignal);
        }

        let duration = samples.len() as f64 / sample_rate as f64;
        let beats = detect_beats(samples, sample_rate)?;

        let (intro_end, main_end) = plan_boundaries(duration, &beats);
        debug!(
            duration,
            beats = beats.len(),
            intro_end,
            main_end,
            "boundaries planned"
        );

        Ok(vec![
            Segment::new(SegmentLabel::Warmup, 0.0, intro_end),
            Segment::new(SegmentLabel::Core, intro_end, main_end),
            Segment::new(SegmentLabel::Cooldown, main_end, duration),
        ])
    }
}

/// Compute the intro and main boundary times for a track of `duration`
/// seconds given detected beat timestamps.
pub fn plan_boundaries(duration: f64, beats: &[f64]) -> (f64, f64) {
    let intro_target = duration / 5.0;
    let main_target = duration * 4.0 / 5.0;

    if beats.len() < MIN_BEATS_FOR_SNAP {
        return (intro_target, main_target);
    }

    let mut intro_end = snap_to_nearest(intro_target, beats);
    if intro_end < MIN_INTRO_SECS {
        intro_end = intro_target;
    }

    let mut main_end = snap_to_nearest(main_target, beats);
    if main_end <= intro_end {
        main_end = main_target;
    }
    // A snapped intro at or past the proportional main target would
    // invert the spans; proportional division always orders correctly.
    if main_end <= intro_end {
        intro_end = intro_target;
    }

    (intro_end, main_end)
}

fn snap_to_nearest(target: f64, beats: &[f64]) -> f64 {
    let mut best = beats[0];
    let mut best_distance = (beats[0] - target).abs();
    for &beat in &beats[1..] {
        let distance = (beat - target).abs();
        if distance < best_distance {
            best = beat;
            best_distance = distance;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(segments: &[Segment]) -> Vec<(f64, f64)> {
        segments
            .iter()
            .map(|s| (s.start_time, s.end_time))
            .collect()
    }

    #[test]
    fn test_proportional_fallback_without_beats() {
        // 300s of silence, fewer than 5 beats: boundaries at exactly
        // 60s and 240s.
        let (intro, main) = plan_boundaries(300.0, &[]);
        assert_eq!(intro, 60.0);
        assert_eq!(main, 240.0);
    }

    #[test]
    fn test_fallback_with_four_beats() {
        let beats = [10.0, 20.0, 30.0, 40.0];
        let (intro, main) = plan_boundaries(300.0, &beats);
        assert_eq!(intro, 60.0);
        assert_eq!(main, 240.0);
    }

    #[test]
    fn test_snaps_to_nearest_beats() {
        // duration 180: targets are 36 and 144; the closest beats are
        // 35.8 and 143.9.
        let beats = [1.2, 20.0, 35.8, 36.5, 90.0, 143.9, 144.6, 170.0];
        let (intro, main) = plan_boundaries(180.0, &beats);
        assert_eq!(intro, 35.8);
        assert_eq!(main, 143.9);
    }

    #[test]
    fn test_intro_clamp_reverts_to_proportional() {
        // Nearest beat to the intro target sits below 1.0s.
        let beats = [0.2, 0.4, 0.6, 0.8, 290.0];
        let (intro, _main) = plan_boundaries(300.0, &beats);
        assert_eq!(intro, 60.0);
    }

    #[test]
    fn test_main_clamp_keeps_order() {
        // All beats cluster early: snapped main would not exceed intro.
        let beats = [10.0, 11.0, 12.0, 13.0, 14.0];
        let (intro, main) = plan_boundaries(300.0, &beats);
        assert_eq!(intro, 14.0);
        assert_eq!(main, 240.0);
        assert!(main > intro);
    }

    #[test]
    fn test_segments_are_contiguous_and_cover_track() {
        let sample_rate = 8000u32;
        let samples = vec![0.0f32; (sample_rate * 300) as usize];
        let engine = SegmentationEngine::with_default_strategy();
        let segments = engine.segment(&samples, sample_rate).unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(
            spans(&segments),
            vec![(0.0, 60.0), (60.0, 240.0), (240.0, 300.0)]
        );
        let total: f64 = segments.iter().map(|s| s.duration()).sum();
        assert!((total - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_segments_for_any_duration() {
        let sample_rate = 8000u32;
        for seconds in [1usize, 7, 61, 247] {
            let samples = vec![0.0f32; sample_rate as usize * seconds];
            let segments = BeatSnapSegmenter.segment(&samples, sample_rate).unwrap();
            assert_eq!(segments.len(), 3);
            assert!(segments.iter().all(|s| s.start_time < s.end_time));
            let total: f64 = segments.iter().map(|s| s.duration()).sum();
            assert!((total - seconds as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_labels_in_order() {
        let samples = vec![0.0f32; 8000 * 30];
        let segments = BeatSnapSegmenter.segment(&samples, 8000).unwrap();
        let labels: Vec<_> = segments.iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec![
                SegmentLabel::Warmup,
                SegmentLabel::Core,
                SegmentLabel::Cooldown
            ]
        );
    }

    #[test]
    fn test_empty_waveform_is_fatal() {
        assert!(BeatSnapSegmenter.segment(&[], 8000).is_err());
    }
}
