//! FFmpeg CLI wrapper and media assembly for the fitclip pipeline.
//!
//! This crate covers everything that touches external media resources:
//! - FFmpeg command building and supervised execution
//! - ffprobe metadata extraction
//! - Waveform extraction for analysis
//! - Streaming download of remote exercise media
//! - Clip composition (loop to exact duration, canonical geometry)
//! - Final concatenation and audio mux
//! - The run-scoped temp workspace with guaranteed cleanup
//!
//! Every temp file created here is registered with the [`RunWorkspace`]
//! the moment it is allocated, and every FFmpeg/ffprobe child is waited
//! on or killed by [`FfmpegRunner`]; no resource outlives its run.

pub mod assemble;
pub mod audio;
pub mod command;
pub mod compose;
pub mod error;
pub mod probe;
pub mod resolver;
pub mod workspace;

pub use assemble::{assemble, RenderSummary};
pub use audio::{extract_waveform, ANALYSIS_SAMPLE_RATE};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compose::{ClipComposer, ComposedClip};
pub use error::{MediaError, MediaResult};
pub use probe::{get_duration, probe_media, MediaInfo};
pub use resolver::{AssetResolver, ResolvedAsset};
pub use workspace::RunWorkspace;
