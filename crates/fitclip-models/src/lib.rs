//! Shared data models for the fitclip pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Track segments and their structural labels
//! - Difficulty tiers
//! - The exercise catalog and its lookup errors
//! - Playlist entries pairing segments with exercises
//! - Run identifiers and per-item warnings

pub mod catalog;
pub mod difficulty;
pub mod playlist;
pub mod run;
pub mod segment;

// Re-export common types
pub use catalog::{Catalog, CatalogError, Category, Exercise};
pub use difficulty::DifficultyTier;
pub use playlist::PlaylistEntry;
pub use run::{RunId, RunWarning};
pub use segment::{Segment, SegmentLabel};
