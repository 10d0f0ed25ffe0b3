//! Short-time Fourier transform plumbing shared by the analysis features.

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::error::{AnalysisError, AnalysisResult};

/// Analysis frame length in samples.
pub(crate) const FRAME_SIZE: usize = 2048;
/// Hop between consecutive frames in samples.
pub(crate) const HOP_SIZE: usize = 512;

/// Reusable Hann-windowed forward FFT over fixed-size frames.
pub(crate) struct Stft {
    plan: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl Stft {
    pub(crate) fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(FRAME_SIZE);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        let window = (0..FRAME_SIZE).map(|i| hann_value(i, FRAME_SIZE)).collect();
        Self {
            plan,
            window,
            input,
            spectrum,
            scratch,
        }
    }

    /// Number of spectrum bins per frame.
    pub(crate) const fn bins() -> usize {
        FRAME_SIZE / 2 + 1
    }

    /// Number of full frames a signal of `samples_len` yields.
    pub(crate) fn frame_count(samples_len: usize) -> usize {
        if samples_len < FRAME_SIZE {
            0
        } else {
            (samples_len - FRAME_SIZE) / HOP_SIZE + 1
        }
    }

    /// Compute the magnitude spectrum of one frame into `mags`
    /// (length [`Stft::bins`]).
    pub(crate) fn magnitudes(&mut self, frame: &[f32], mags: &mut [f32]) -> AnalysisResult<()> {
        for ((dst, src), w) in self.input.iter_mut().zip(frame).zip(&self.window) {
            *dst = src * w;
        }
        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .map_err(|e| AnalysisError::feature(e.to_string()))?;
        for (dst, bin) in mags.iter_mut().zip(&self.spectrum) {
            *dst = bin.norm();
        }
        Ok(())
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}
