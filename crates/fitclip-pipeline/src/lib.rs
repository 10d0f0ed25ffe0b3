//! Run orchestration for the fitclip pipeline.
//!
//! This crate wires the stages together: waveform extraction,
//! segmentation, catalog matching, asset resolution, clip composition,
//! and final assembly. It owns:
//! - Per-run configuration and deadlines
//! - Catalog loading
//! - Warning accumulation across stages
//! - The unconditional resource-release step at the end of every run

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod pipeline;

pub use catalog::load_catalog;
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, RunFailure};
pub use logging::RunLogger;
pub use matcher::CatalogMatcher;
pub use pipeline::{RunOutcome, RunRequest, SegmentationChoice, WorkoutPipeline};
