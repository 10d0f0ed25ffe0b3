//! Self-similarity novelty segmentation, the alternative strategy.
//!
//! Per-frame RMS and spectral-centroid features are compared through a
//! checkerboard kernel sliding along the self-similarity diagonal; the
//! strongest novelty peaks become structural boundaries. The strategy
//! targets a fixed number of spans and falls back to a single
//! whole-track segment when the expected boundary count does not
//! materialize.

use tracing::debug;

use fitclip_models::{Segment, SegmentLabel};

use crate::engine::SegmentationStrategy;
use crate::error::{AnalysisError, AnalysisResult};
use crate::stft::{Stft, FRAME_SIZE, HOP_SIZE};

/// Number of structural spans the strategy targets.
const TARGET_SPANS: usize = 3;

/// Half-width of the checkerboard kernel, in frames.
const KERNEL_HALF: usize = 32;

/// Minimum distance between boundaries (and from the track edges) as a
/// fraction of the track duration.
const MIN_BOUNDARY_SEPARATION: f64 = 0.05;

/// Novelty peaks must clear the curve mean by this many sigmas.
const PEAK_BIAS: f32 = 0.5;

pub struct NoveltySegmenter;

impl SegmentationStrategy for NoveltySegmenter {
    fn name(&self) -> &'static str {
        "novelty"
    }

    fn segment(&self, samples: &[f32], sample_rate: u32) -> AnalysisResult<Vec<Segment>> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate(sample_rate));
        }
        if samples.is_empty() {
            return Err(AnalysisError::EmptySignal);
        }

        let duration = samples.len() as f64 / sample_rate as f64;
        let hop_secs = HOP_SIZE as f64 / sample_rate as f64;

        let features = frame_features(samples)?;
        let boundaries = if features.len() > 2 * KERNEL_HALF {
            let novelty = novelty_curve(&features);
            select_boundaries(&novelty, duration, hop_secs)
        } else {
            Vec::new()
        };

        // The track partitions into TARGET_SPANS spans only when exactly
        // TARGET_SPANS + 1 boundary times emerged (edges included).
        if boundaries.len() != TARGET_SPANS + 1 {
            debug!(
                found = boundaries.len(),
                expected = TARGET_SPANS + 1,
                "structural boundaries not found, falling back to whole track"
            );
            return Ok(vec![Segment::new(SegmentLabel::FullTrack, 0.0, duration)]);
        }

        let labels = [
            SegmentLabel::Warmup,
            SegmentLabel::Core,
            SegmentLabel::Cooldown,
        ];
        let segments = boundaries
            .windows(2)
            .zip(labels)
            .map(|(pair, label)| Segment::new(label, pair[0], pair[1]))
            .collect();
        Ok(segments)
    }
}

/// Per-frame `[rms, spectral centroid]`, z-scored per dimension.
fn frame_features(samples: &[f32]) -> AnalysisResult<Vec<[f32; 2]>> {
    let frames = Stft::frame_count(samples.len());
    if frames == 0 {
        return Ok(Vec::new());
    }

    let mut stft = Stft::new();
    let mut mags = vec![0.0f32; Stft::bins()];
    let mut features = Vec::with_capacity(frames);

    for i in 0..frames {
        let offset = i * HOP_SIZE;
        let frame = &samples[offset..offset + FRAME_SIZE];
        stft.magnitudes(frame, &mut mags)?;

        let rms = (frame.iter().map(|s| s * s).sum::<f32>() / FRAME_SIZE as f32).sqrt();

        let magnitude_sum: f32 = mags.iter().sum();
        let weighted_sum: f32 = mags
            .iter()
            .enumerate()
            .map(|(bin, m)| m * bin as f32)
            .sum();
        let centroid = if magnitude_sum > f32::EPSILON {
            weighted_sum / magnitude_sum / Stft::bins() as f32
        } else {
            0.0
        };

        features.push([rms, centroid]);
    }

    z_score(&mut features);
    Ok(features)
}

fn z_score(features: &mut [[f32; 2]]) {
    let n = features.len() as f32;
    if n == 0.0 {
        return;
    }
    for dim in 0..2 {
        let mean = features.iter().map(|f| f[dim]).sum::<f32>() / n;
        let variance = features
            .iter()
            .map(|f| (f[dim] - mean) * (f[dim] - mean))
            .sum::<f32>()
            / n;
        let std = variance.sqrt();
        if std > f32::EPSILON {
            for f in features.iter_mut() {
                f[dim] = (f[dim] - mean) / std;
            }
        } else {
            for f in features.iter_mut() {
                f[dim] = 0.0;
            }
        }
    }
}

/// Checkerboard novelty along the self-similarity diagonal.
///
/// Similarities are evaluated lazily inside the kernel window, so the
/// full frame-by-frame similarity matrix is never materialized.
fn novelty_curve(features: &[[f32; 2]]) -> Vec<f32> {
    let n = features.len();
    let mut novelty = vec![0.0f32; n];

    for i in 0..n {
        let mut score = 0.0f32;
        for u in -(KERNEL_HALF as isize)..KERNEL_HALF as isize {
            for v in -(KERNEL_HALF as isize)..KERNEL_HALF as isize {
                let a = i as isize + u;
                let b = i as isize + v;
                if a < 0 || b < 0 || a >= n as isize || b >= n as isize {
                    continue;
                }
                let same_side = (u < 0) == (v < 0);
                let sign = if same_side { 1.0 } else { -1.0 };
                score += sign * similarity(&features[a as usize], &features[b as usize]);
            }
        }
        novelty[i] = score.max(0.0);
    }

    novelty
}

fn similarity(a: &[f32; 2], b: &[f32; 2]) -> f32 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    (-(d0 * d0 + d1 * d1) / 2.0).exp()
}

/// Pick the strongest novelty peaks as boundary times. Returns the full
/// boundary list `[0, b1, .., duration]`; fewer than the expected count
/// means the caller should fall back.
fn select_boundaries(novelty: &[f32], duration: f64, hop_secs: f64) -> Vec<f64> {
    let n = novelty.len() as f32;
    if n == 0.0 {
        return Vec::new();
    }
    let mean = novelty.iter().sum::<f32>() / n;
    let variance = novelty.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let threshold = mean + PEAK_BIAS * variance.sqrt();
    if threshold <= f32::EPSILON {
        return Vec::new();
    }

    let mut peaks: Vec<(usize, f32)> = (1..novelty.len().saturating_sub(1))
        .filter(|&i| {
            novelty[i] > threshold && novelty[i] >= novelty[i - 1] && novelty[i] >= novelty[i + 1]
        })
        .map(|i| (i, novelty[i]))
        .collect();
    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let min_gap = MIN_BOUNDARY_SEPARATION * duration;
    let mut accepted: Vec<f64> = Vec::new();
    for (index, _) in peaks {
        if accepted.len() == TARGET_SPANS - 1 {
            break;
        }
        let time = index as f64 * hop_secs;
        let clear_of_edges = time >= min_gap && time <= duration - min_gap;
        let clear_of_others = accepted.iter().all(|t| (t - time).abs() >= min_gap);
        if clear_of_edges && clear_of_others {
            accepted.push(time);
        }
    }

    if accepted.len() != TARGET_SPANS - 1 {
        return Vec::new();
    }

    accepted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut boundaries = Vec::with_capacity(TARGET_SPANS + 1);
    boundaries.push(0.0);
    boundaries.extend(accepted);
    boundaries.push(duration);
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_signal_falls_back_to_whole_track() {
        let samples = vec![0.0f32; 8000 * 60];
        let segments = NoveltySegmenter.segment(&samples, 8000).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].label, SegmentLabel::FullTrack);
        assert_eq!(segments[0].start_time, 0.0);
        assert!((segments[0].end_time - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_texture_signal_finds_boundaries() {
        let sample_rate = 8000u32;
        let total = 180 * sample_rate as usize;
        let third = total / 3;
        let mut samples = Vec::with_capacity(total);
        for i in 0..total {
            let amplitude = if i < third {
                0.1
            } else if i < 2 * third {
                0.9
            } else {
                0.3
            };
            let t = i as f32 / sample_rate as f32;
            samples.push(amplitude * (2.0 * std::f32::consts::PI * 220.0 * t).sin());
        }

        let segments = NoveltySegmenter.segment(&samples, sample_rate).unwrap();
        assert_eq!(segments.len(), 3);
        assert!((segments[0].end_time - 60.0).abs() < 3.0);
        assert!((segments[1].end_time - 120.0).abs() < 3.0);
        // Contiguous cover of the whole track.
        assert_eq!(segments[0].start_time, 0.0);
        assert_eq!(segments[0].end_time, segments[1].start_time);
        assert_eq!(segments[1].end_time, segments[2].start_time);
        assert!((segments[2].end_time - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_signal_falls_back() {
        let samples = vec![0.5f32; 4096];
        let segments = NoveltySegmenter.segment(&samples, 8000).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].label, SegmentLabel::FullTrack);
    }
}
