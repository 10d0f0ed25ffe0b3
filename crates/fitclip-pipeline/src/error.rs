//! Pipeline error types.

use thiserror::Error;

use fitclip_analysis::AnalysisError;
use fitclip_media::MediaError;
use fitclip_models::{CatalogError, RunWarning};

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal, stage-level conditions. Per-item conditions never reach this
/// type; they are recorded as [`RunWarning`]s instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("media error: {0}")]
    Media(#[from] MediaError),

    #[error("run deadline of {0} seconds exceeded")]
    DeadlineExceeded(u64),

    #[error("run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failed run: the fatal error plus every per-item warning that
/// accumulated before it, so callers still see which segments lost
/// content.
#[derive(Debug)]
pub struct RunFailure {
    pub error: PipelineError,
    pub warnings: Vec<RunWarning>,
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        if !self.warnings.is_empty() {
            write!(f, " ({} warnings)", self.warnings.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
