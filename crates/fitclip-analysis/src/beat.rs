//! Beat timestamp estimation from a mono waveform.
//!
//! Onsets are located on a spectral-flux envelope: the positive change in
//! magnitude between consecutive Hann-windowed frames, peak-picked
//! against an adaptive local threshold. The resulting onset times stand
//! in for beat timestamps; arrhythmic material (silence, noise, speech)
//! produces few or none, which downstream treats as degenerate rhythm.

use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};
use crate::stft::{Stft, FRAME_SIZE, HOP_SIZE};

/// Minimum spacing between two reported beats.
const MIN_BEAT_GAP_SECS: f64 = 0.25;

/// Frames on each side of a candidate feeding the adaptive threshold.
const PEAK_WINDOW: usize = 16;

/// Sigma multiplier over the local mean a peak must clear.
const PEAK_BIAS: f32 = 1.5;

/// Floor below which envelope values are never peaks.
const MIN_ONSET_STRENGTH: f32 = 1e-4;

/// Estimate beat timestamps (seconds) for a mono waveform.
///
/// Returns an empty vector for signals shorter than one analysis frame
/// or without salient onsets; that is a degenerate-rhythm signal, not an
/// error.
pub fn detect_beats(samples: &[f32], sample_rate: u32) -> AnalysisResult<Vec<f64>> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidSampleRate(sample_rate));
    }
    if samples.is_empty() {
        return Err(AnalysisError::EmptySignal);
    }

    let envelope = onset_envelope(samples)?;
    let hop_secs = HOP_SIZE as f64 / sample_rate as f64;
    // Report each onset at its frame center, not the frame start.
    let center_secs = (FRAME_SIZE / 2) as f64 / sample_rate as f64;
    let beats = pick_peaks(&envelope, hop_secs, center_secs);

    debug!(
        frames = envelope.len(),
        beats = beats.len(),
        tempo_bpm = estimate_tempo_bpm(&beats),
        "onset detection complete"
    );

    Ok(beats)
}

/// Tempo estimate from the median inter-beat interval, if enough beats
/// were found.
pub fn estimate_tempo_bpm(beats: &[f64]) -> Option<f64> {
    if beats.len() < 2 {
        return None;
    }
    let mut intervals: Vec<f64> = beats
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > f64::EPSILON)
        .collect();
    if intervals.is_empty() {
        return None;
    }
    intervals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = intervals[intervals.len() / 2];
    Some(60.0 / median)
}

/// Positive spectral flux per frame. The first frame is forced to zero
/// so the transition from nothing into signal does not register as an
/// onset.
fn onset_envelope(samples: &[f32]) -> AnalysisResult<Vec<f32>> {
    let frames = Stft::frame_count(samples.len());
    if frames == 0 {
        return Ok(Vec::new());
    }

    let mut stft = Stft::new();
    let mut prev = vec![0.0f32; Stft::bins()];
    let mut mags = vec![0.0f32; Stft::bins()];
    let mut envelope = Vec::with_capacity(frames);

    for i in 0..frames {
        let offset = i * HOP_SIZE;
        stft.magnitudes(&samples[offset..offset + FRAME_SIZE], &mut mags)?;
        let flux: f32 = mags
            .iter()
            .zip(&prev)
            .map(|(m, p)| (m - p).max(0.0))
            .sum();
        envelope.push(if i == 0 { 0.0 } else { flux });
        prev.copy_from_slice(&mags);
    }

    Ok(envelope)
}

/// Local maxima that clear an adaptive mean + sigma threshold, thinned
/// to the minimum beat gap.
fn pick_peaks(envelope: &[f32], hop_secs: f64, center_secs: f64) -> Vec<f64> {
    let mut beats = Vec::new();

    for i in 1..envelope.len().saturating_sub(1) {
        let value = envelope[i];
        if value <= MIN_ONSET_STRENGTH {
            continue;
        }
        if value < envelope[i - 1] || value < envelope[i + 1] {
            continue;
        }

        let lo = i.saturating_sub(PEAK_WINDOW);
        let hi = (i + PEAK_WINDOW + 1).min(envelope.len());
        let window = &envelope[lo..hi];
        let mean = window.iter().sum::<f32>() / window.len() as f32;
        let variance =
            window.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / window.len() as f32;
        if value <= mean + PEAK_BIAS * variance.sqrt() {
            continue;
        }

        let time = i as f64 * hop_secs + center_secs;
        if beats
            .last()
            .map(|last| time - last >= MIN_BEAT_GAP_SECS)
            .unwrap_or(true)
        {
            beats.push(time);
        }
    }

    beats
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clicks every `interval` seconds starting at `interval`.
    fn click_track(duration_secs: f64, interval: f64, sample_rate: u32) -> Vec<f32> {
        let mut samples = vec![0.0f32; (duration_secs * sample_rate as f64) as usize];
        let mut t = interval;
        while t < duration_secs {
            let start = (t * sample_rate as f64) as usize;
            for s in samples.iter_mut().skip(start).take(64) {
                *s = 1.0;
            }
            t += interval;
        }
        samples
    }

    #[test]
    fn test_silence_has_no_beats() {
        let samples = vec![0.0f32; 8000 * 30];
        let beats = detect_beats(&samples, 8000).unwrap();
        assert!(beats.is_empty());
    }

    #[test]
    fn test_empty_signal_is_an_error() {
        assert!(matches!(
            detect_beats(&[], 8000),
            Err(AnalysisError::EmptySignal)
        ));
    }

    #[test]
    fn test_zero_sample_rate_is_an_error() {
        assert!(matches!(
            detect_beats(&[0.0; 4096], 0),
            Err(AnalysisError::InvalidSampleRate(0))
        ));
    }

    #[test]
    fn test_click_track_beats_land_on_clicks() {
        let sample_rate = 8000;
        let interval = 0.5;
        let samples = click_track(30.0, interval, sample_rate);
        let beats = detect_beats(&samples, sample_rate).unwrap();

        assert!(beats.len() >= 20, "expected many beats, got {}", beats.len());
        // Each detected beat sits within one hop of a click time.
        let hop_secs = 512.0 / sample_rate as f64;
        for beat in &beats {
            let nearest_click = (beat / interval).round() * interval;
            assert!(
                (beat - nearest_click).abs() <= 2.0 * hop_secs,
                "beat {} too far from any click",
                beat
            );
        }
    }

    #[test]
    fn test_tempo_from_click_track() {
        let samples = click_track(30.0, 0.5, 8000);
        let beats = detect_beats(&samples, 8000).unwrap();
        let bpm = estimate_tempo_bpm(&beats).unwrap();
        assert!((bpm - 120.0).abs() < 15.0, "bpm {}", bpm);
    }

    #[test]
    fn test_short_signal_yields_no_beats() {
        let beats = detect_beats(&[0.1f32; 1024], 8000).unwrap();
        assert!(beats.is_empty());
    }
}
