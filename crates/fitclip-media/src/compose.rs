//! Clip composition: normalize fetched assets to segment durations.
//!
//! Each resolved asset is decoded, scaled to the canonical output frame
//! width, and looped until it fills exactly its segment's duration.
//! Looping, not freeze-framing or truncating short: the composed clip's
//! length must equal the segment's length so concatenation lines up
//! with the track's structure.

use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use fitclip_models::{PlaylistEntry, RunWarning};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;
use crate::resolver::ResolvedAsset;
use crate::workspace::RunWorkspace;

/// A duration-normalized media unit bound to exactly one playlist
/// entry.
#[derive(Debug)]
pub struct ComposedClip {
    pub entry: PlaylistEntry,
    pub path: PathBuf,
}

/// Per-item result inside the compose fan-out.
enum ItemOutcome {
    Composed(Box<ComposedClip>),
    /// Decode failed; carries the warning to record.
    Dropped { exercise: String, reason: String },
    /// Never resolved upstream; already warned about at fetch time.
    Unresolved,
}

/// Composes resolved assets into uniform, concat-ready clips.
pub struct ClipComposer {
    frame_width: u32,
    frame_rate: u32,
    max_parallel: usize,
}

impl ClipComposer {
    pub fn new(frame_width: u32, max_parallel: usize) -> Self {
        Self {
            frame_width,
            frame_rate: 30,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Compose every resolved asset into a clip of exactly its
    /// segment's duration.
    ///
    /// Unresolved entries and decode failures are per-item conditions:
    /// the entry is dropped with a warning and the rest continue, order
    /// preserved. Cancellation aborts the whole stage.
    pub async fn compose_all(
        &self,
        runner: &FfmpegRunner,
        assets: Vec<ResolvedAsset>,
        workspace: &RunWorkspace,
        warnings: &mut Vec<RunWarning>,
    ) -> MediaResult<Vec<ComposedClip>> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));

        let futures: Vec<_> = assets
            .into_iter()
            .enumerate()
            .map(|(index, asset)| {
                let semaphore = semaphore.clone();
                async move {
                    let ResolvedAsset { entry, local_path } = asset;
                    let Some(asset_path) = local_path else {
                        return Ok(ItemOutcome::Unresolved);
                    };

                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => return Err(MediaError::Cancelled),
                    };

                    let output = workspace.allocate(&format!("clip-{}", index), "mp4");
                    match self
                        .compose_one(runner, &asset_path, entry.duration, &output)
                        .await
                    {
                        Ok(()) => {
                            info!(
                                exercise = %entry.exercise.name,
                                duration = entry.duration,
                                path = %output.display(),
                                "clip composed"
                            );
                            Ok(ItemOutcome::Composed(Box::new(ComposedClip {
                                entry,
                                path: output,
                            })))
                        }
                        Err(e) if e.is_per_item() => {
                            warn!(
                                exercise = %entry.exercise.name,
                                error = %e,
                                "clip decode failed, entry dropped"
                            );
                            Ok(ItemOutcome::Dropped {
                                exercise: entry.exercise.name,
                                reason: e.to_string(),
                            })
                        }
                        Err(e) => Err(e),
                    }
                }
            })
            .collect();

        // join_all preserves input order, so clips and warnings both
        // come out in segment order.
        let mut clips = Vec::new();
        for result in join_all(futures).await {
            match result? {
                ItemOutcome::Composed(clip) => clips.push(*clip),
                ItemOutcome::Dropped { exercise, reason } => {
                    warnings.push(RunWarning::ClipDecode { exercise, reason });
                }
                ItemOutcome::Unresolved => {}
            }
        }
        Ok(clips)
    }

    /// Decode-check the asset, then loop and scale it to the target.
    async fn compose_one(
        &self,
        runner: &FfmpegRunner,
        asset_path: &Path,
        target_duration: f64,
        output: &Path,
    ) -> MediaResult<()> {
        let info = probe_media(asset_path).await.map_err(|e| match e {
            // A missing tool, cancellation, or deadline expiry is fatal
            // to the run, not a property of this asset.
            MediaError::Cancelled | MediaError::Timeout(_) | MediaError::FfprobeNotFound => e,
            other => MediaError::decode_failed(other.to_string()),
        })?;
        if !info.has_video {
            return Err(MediaError::decode_failed("asset has no video stream"));
        }

        let filter = format!("scale={}:-2,fps={}", self.frame_width, self.frame_rate);
        let cmd = FfmpegCommand::new(output)
            .input_with_args(["-stream_loop", "-1"], asset_path)
            .duration(target_duration)
            .video_filter(filter)
            .output_args(["-an"])
            .video_codec("libx264")
            .preset("veryfast")
            .crf(23)
            .output_args(["-pix_fmt", "yuv420p"]);

        runner.run(&cmd).await.map_err(|e| match e {
            MediaError::FfmpegFailed {
                message, stderr, ..
            } => MediaError::decode_failed(format!(
                "{}{}",
                message,
                stderr.map(|s| format!(": {}", s)).unwrap_or_default()
            )),
            // A single clip exceeding the FFmpeg deadline is the same
            // per-item condition as any other decode failure.
            MediaError::Timeout(secs) => {
                MediaError::decode_failed(format!("compose timed out after {} seconds", secs))
            }
            other => other,
        })
    }
}
