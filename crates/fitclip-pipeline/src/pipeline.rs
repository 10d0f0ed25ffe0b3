//! End-to-end run orchestration.
//!
//! One [`WorkoutPipeline::run`] call is one unit of work: decode the
//! track, segment it, match exercises, fetch and compose their media,
//! assemble the output. Per-item failures along the way become
//! warnings; stage failures abort. Either way, the run workspace is
//! cleaned up unconditionally before the result is returned.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use fitclip_analysis::{
    AnalysisError, BeatSnapSegmenter, NoveltySegmenter, SegmentationEngine,
};
use fitclip_media::{
    assemble, extract_waveform, AssetResolver, ClipComposer, FfmpegRunner, MediaError,
    RenderSummary, RunWorkspace, ANALYSIS_SAMPLE_RATE,
};
use fitclip_models::{Catalog, PlaylistEntry, RunId, RunWarning};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, RunFailure};
use crate::logging::RunLogger;
use crate::matcher::CatalogMatcher;

/// Which segmentation strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentationChoice {
    /// Beat-snapped proportional division (default).
    #[default]
    Beats,
    /// Self-similarity novelty boundaries with whole-track fallback.
    Novelty,
}

#[derive(Debug, Error)]
#[error("unknown segmentation strategy: {0} (expected 'beats' or 'novelty')")]
pub struct ParseStrategyError(String);

impl FromStr for SegmentationChoice {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beats" => Ok(SegmentationChoice::Beats),
            "novelty" => Ok(SegmentationChoice::Novelty),
            other => Err(ParseStrategyError(other.to_string())),
        }
    }
}

impl fmt::Display for SegmentationChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentationChoice::Beats => write!(f, "beats"),
            SegmentationChoice::Novelty => write!(f, "novelty"),
        }
    }
}

/// One unit of work: a source track, a difficulty, an output target.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub audio_path: PathBuf,
    /// Raw difficulty string; resolved leniently with a low default.
    pub difficulty: String,
    pub output_path: PathBuf,
    /// Seed for exercise selection; random when absent.
    pub seed: Option<u64>,
    pub strategy: SegmentationChoice,
}

/// A successful run: the output reference plus everything observed on
/// the way there.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub render: RenderSummary,
    /// The exercises that actually rendered, one per surviving segment,
    /// in segment order (name and narration included).
    pub playlist: Vec<PlaylistEntry>,
    pub warnings: Vec<RunWarning>,
    pub finished_at: DateTime<Utc>,
}

/// The pipeline coordinator.
pub struct WorkoutPipeline {
    config: PipelineConfig,
}

impl WorkoutPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Execute one run without external cancellation.
    pub async fn run(
        &self,
        catalog: &Catalog,
        request: RunRequest,
    ) -> Result<RunOutcome, RunFailure> {
        // A receiver whose sender is gone can never fire.
        let (_, rx) = watch::channel(false);
        self.run_with_cancel(catalog, request, rx).await
    }

    /// Execute one run, observing `cancel_rx`. A cancelled run aborts
    /// at the next supervised operation and still executes the full
    /// resource-release step.
    pub async fn run_with_cancel(
        &self,
        catalog: &Catalog,
        request: RunRequest,
        cancel_rx: watch::Receiver<bool>,
    ) -> Result<RunOutcome, RunFailure> {
        let run_id = RunId::new();
        let logger = RunLogger::new(&run_id, "workout_render");
        logger.log_start(&format!(
            "{} -> {} (difficulty '{}', strategy {})",
            request.audio_path.display(),
            request.output_path.display(),
            request.difficulty,
            request.strategy,
        ));

        let workspace = match RunWorkspace::create(&self.config.work_dir, &run_id).await {
            Ok(workspace) => workspace,
            Err(e) => {
                return Err(RunFailure {
                    error: e.into(),
                    warnings: Vec::new(),
                })
            }
        };

        let mut warnings = Vec::new();
        let deadline = self.config.run_timeout;
        let result = match tokio::time::timeout(
            deadline,
            self.execute(catalog, &request, &workspace, cancel_rx, &mut warnings),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                // The deadline can abandon the final render mid-write;
                // no partial output file may be left in place.
                if let Err(e) = tokio::fs::remove_file(&request.output_path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            output = %request.output_path.display(),
                            error = %e,
                            "failed to remove partial output"
                        );
                    }
                }
                Err(PipelineError::DeadlineExceeded(deadline.as_secs()))
            }
        };

        // The release step runs unconditionally: success, per-item
        // skips, fatal error, deadline, or cancellation.
        workspace.cleanup().await;

        match result {
            Ok((render, playlist)) => {
                logger.log_completion(&format!(
                    "rendered {} ({} segments, {} warnings)",
                    render.output_path.display(),
                    playlist.len(),
                    warnings.len()
                ));
                Ok(RunOutcome {
                    run_id,
                    render,
                    playlist,
                    warnings,
                    finished_at: Utc::now(),
                })
            }
            Err(error) => {
                let error = normalize(error);
                logger.log_error(&error.to_string());
                Err(RunFailure { error, warnings })
            }
        }
    }

    async fn execute(
        &self,
        catalog: &Catalog,
        request: &RunRequest,
        workspace: &RunWorkspace,
        cancel_rx: watch::Receiver<bool>,
        warnings: &mut Vec<RunWarning>,
    ) -> PipelineResult<(RenderSummary, Vec<PlaylistEntry>)> {
        let runner = FfmpegRunner::new()
            .with_timeout(self.config.ffmpeg_timeout.as_secs())
            .with_cancel(cancel_rx);

        // Stage 1: decode the track for analysis.
        let samples = extract_waveform(&request.audio_path, workspace, &runner)
            .await
            .map_err(lift_decode_error)?;

        // Stage 2: structural segmentation.
        let engine = match request.strategy {
            SegmentationChoice::Beats => SegmentationEngine::new(Box::new(BeatSnapSegmenter)),
            SegmentationChoice::Novelty => SegmentationEngine::new(Box::new(NoveltySegmenter)),
        };
        let segments = engine.segment(&samples, ANALYSIS_SAMPLE_RATE)?;

        // Stage 3: catalog matching.
        let seed = request.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let matcher = CatalogMatcher::new(catalog);
        let playlist = matcher.match_segments(&segments, &request.difficulty, &mut rng, warnings)?;
        info!(entries = playlist.len(), seed, "playlist matched");

        // Stage 4: fetch exercise media, tolerating per-item failure.
        let resolver = AssetResolver::new(self.config.fetch_timeout, self.config.max_fetch_parallel)?;
        let resolved = resolver.resolve(playlist, workspace, warnings).await;

        // Stage 5: compose clips, tolerating per-item failure.
        let composer =
            ClipComposer::new(self.config.frame_width, self.config.max_compose_parallel);
        let clips = composer
            .compose_all(&runner, resolved, workspace, warnings)
            .await?;

        // Stage 6: concatenate, mux, render.
        let render = assemble(
            &runner,
            &clips,
            &request.audio_path,
            workspace,
            &request.output_path,
        )
        .await?;

        let rendered: Vec<PlaylistEntry> = clips.into_iter().map(|c| c.entry).collect();
        Ok((render, rendered))
    }
}

/// Waveform extraction failures are segmentation-stage failures, except
/// the ones that speak for the whole run.
fn lift_decode_error(e: MediaError) -> PipelineError {
    match e {
        MediaError::Cancelled => PipelineError::Cancelled,
        MediaError::FfmpegNotFound | MediaError::Timeout(_) => PipelineError::Media(e),
        other => PipelineError::Analysis(AnalysisError::decode(other.to_string())),
    }
}

fn normalize(error: PipelineError) -> PipelineError {
    match error {
        PipelineError::Media(MediaError::Cancelled) => PipelineError::Cancelled,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitclip_models::{Category, DifficultyTier, Exercise};
    use tempfile::TempDir;

    fn test_catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.insert(
            Category::Warmup,
            DifficultyTier::Low,
            vec![Exercise {
                name: "march".to_string(),
                media_url: "https://cdn.example.com/march.mp4".to_string(),
                narration_text: String::new(),
            }],
        );
        catalog
    }

    fn pipeline_in(dir: &TempDir) -> WorkoutPipeline {
        let config = PipelineConfig {
            work_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        WorkoutPipeline::new(config)
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "beats".parse::<SegmentationChoice>().unwrap(),
            SegmentationChoice::Beats
        );
        assert_eq!(
            "NOVELTY".parse::<SegmentationChoice>().unwrap(),
            SegmentationChoice::Novelty
        );
        assert!("cluster".parse::<SegmentationChoice>().is_err());
    }

    #[tokio::test]
    async fn test_missing_audio_fails_and_cleans_workspace() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(&dir);

        let request = RunRequest {
            audio_path: PathBuf::from("/nonexistent/track.mp3"),
            difficulty: "low".to_string(),
            output_path: dir.path().join("out.mp4"),
            seed: Some(1),
            strategy: SegmentationChoice::Beats,
        };

        let failure = pipeline.run(&test_catalog(), request).await.unwrap_err();
        assert!(matches!(failure.error, PipelineError::Analysis(_)));
        assert!(failure.warnings.is_empty());

        // No run workspace survives a failed run.
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut leftover_runs = 0;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_name().to_string_lossy().starts_with("run-") {
                leftover_runs += 1;
            }
        }
        assert_eq!(leftover_runs, 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_reports_cancellation() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(&dir);

        let (tx, rx) = watch::channel(true);
        // Create a real file so the run reaches the first supervised
        // FFmpeg invocation, which observes the cancel flag.
        let audio = dir.path().join("track.mp3");
        tokio::fs::write(&audio, b"fake audio").await.unwrap();

        let request = RunRequest {
            audio_path: audio,
            difficulty: "low".to_string(),
            output_path: dir.path().join("out.mp4"),
            seed: Some(1),
            strategy: SegmentationChoice::Beats,
        };

        let failure = pipeline
            .run_with_cancel(&test_catalog(), request, rx)
            .await
            .unwrap_err();
        drop(tx);
        // Either FFmpeg is present and the cancel fires, or it is
        // absent and the run aborts on the missing tool. Both leave a
        // clean work dir.
        assert!(matches!(
            failure.error,
            PipelineError::Cancelled | PipelineError::Media(MediaError::FfmpegNotFound)
        ));

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(
                !entry.file_name().to_string_lossy().starts_with("run-"),
                "run workspace left behind"
            );
        }
    }
}
