//! Waveform segmentation for the fitclip pipeline.
//!
//! This crate turns a decoded mono waveform into an ordered, contiguous
//! set of labeled time segments. Two strategies implement the same
//! contract:
//! - [`BeatSnapSegmenter`] (default): proportional boundary targets
//!   snapped to the nearest detected beat, with sanity clamps and a pure
//!   proportional fallback for degenerate rhythm.
//! - [`NoveltySegmenter`]: self-similarity novelty boundaries targeting a
//!   fixed number of structural spans, falling back to a single
//!   whole-track segment when the expected boundaries are not found.
//!
//! Segmentation never returns a partial result: any decode or
//! feature-extraction failure is a fatal [`AnalysisError`].

pub mod beat;
pub mod engine;
pub mod error;
pub mod novelty;

mod stft;

pub use beat::{detect_beats, estimate_tempo_bpm};
pub use engine::{BeatSnapSegmenter, SegmentationEngine, SegmentationStrategy};
pub use error::{AnalysisError, AnalysisResult};
pub use novelty::NoveltySegmenter;
