//! fitclip binary: one-shot audio -> workout video runs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fitclip_pipeline::{
    load_catalog, PipelineConfig, RunRequest, SegmentationChoice, WorkoutPipeline,
};

/// Audio extensions accepted as input.
const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "ogg", "flac"];

#[derive(Debug, Parser)]
#[command(
    name = "fitclip",
    about = "Turn an audio track into a guided workout video"
)]
struct Args {
    /// Source audio track.
    #[arg(long)]
    audio: PathBuf,

    /// Exercise catalog (JSON).
    #[arg(long)]
    catalog: PathBuf,

    /// Output video path.
    #[arg(long)]
    output: PathBuf,

    /// Difficulty tier (low, medium, high). Unknown values fall back to
    /// low.
    #[arg(long, default_value = "low")]
    difficulty: String,

    /// Seed for exercise selection; omit for a random playlist.
    #[arg(long)]
    seed: Option<u64>,

    /// Segmentation strategy (beats, novelty).
    #[arg(long, default_value = "beats")]
    strategy: SegmentationChoice,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();

    if !is_allowed_audio(&args.audio) {
        error!(
            audio = %args.audio.display(),
            allowed = ?ALLOWED_EXTENSIONS,
            "unsupported audio input"
        );
        return ExitCode::FAILURE;
    }

    if let Err(e) = fitclip_media::check_ffmpeg().and(fitclip_media::check_ffprobe()) {
        error!(error = %e, "media tooling missing");
        return ExitCode::FAILURE;
    }

    // The catalog is loaded once and shared read-only with the run.
    let catalog = match load_catalog(&args.catalog) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "catalog load failed");
            return ExitCode::FAILURE;
        }
    };

    let config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", config);

    let pipeline = WorkoutPipeline::new(config);
    let request = RunRequest {
        audio_path: args.audio,
        difficulty: args.difficulty,
        output_path: args.output,
        seed: args.seed,
        strategy: args.strategy,
    };

    match pipeline.run(&catalog, request).await {
        Ok(outcome) => {
            for entry in &outcome.playlist {
                info!(
                    segment = %entry.segment,
                    exercise = %entry.exercise.name,
                    narration = %entry.exercise.narration_text,
                    "rendered segment"
                );
            }
            for warning in &outcome.warnings {
                warn!(%warning, "run warning");
            }
            info!(
                output = %outcome.render.output_path.display(),
                video_duration = outcome.render.expected_video_duration,
                audio_duration = outcome.render.audio_duration,
                container_duration = outcome.render.container_duration,
                "workout video rendered"
            );
            ExitCode::SUCCESS
        }
        Err(failure) => {
            for warning in &failure.warnings {
                warn!(%warning, "run warning");
            }
            error!(error = %failure.error, "run failed");
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing with colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("fitclip=info".parse().expect("static directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Gate on file extension before any work happens.
fn is_allowed_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
