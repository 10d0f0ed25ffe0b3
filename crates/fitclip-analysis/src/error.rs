//! Error types for waveform analysis.

use thiserror::Error;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that can occur during segmentation.
///
/// All of these are fatal to the segmentation stage; there is no partial
/// segmentation result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("waveform decode failed: {0}")]
    Decode(String),

    #[error("waveform is empty")]
    EmptySignal,

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("feature extraction failed: {0}")]
    Feature(String),
}

impl AnalysisError {
    /// Create a decode failure error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a feature-extraction failure error.
    pub fn feature(message: impl Into<String>) -> Self {
        Self::Feature(message.into())
    }
}
