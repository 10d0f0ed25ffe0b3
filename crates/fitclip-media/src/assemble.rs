//! Final assembly: concatenate composed clips and mux the original
//! audio.
//!
//! Length policy: the rendered container ends at the shorter of the two
//! streams (`-shortest`). The concatenated video derives from the same
//! track the audio comes from, so drift is bounded by boundary
//! rounding; both durations are reported in [`RenderSummary`] so
//! callers observe the applied trim instead of guessing.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::compose::ComposedClip;
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;
use crate::workspace::RunWorkspace;

/// What the render produced, including the length-policy evidence.
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub output_path: PathBuf,
    /// Sum of composed clip durations (what the video side should be).
    pub expected_video_duration: f64,
    /// Probed duration of the source audio track.
    pub audio_duration: f64,
    /// Probed duration of the rendered container.
    pub container_duration: f64,
}

/// Concatenate `clips` in order and mux them against `audio_track`,
/// rendering to `output`.
///
/// Zero surviving clips aborts immediately with
/// [`MediaError::NoRenderableContent`] and produces no output file.
/// A render failure is fatal, carries FFmpeg's stderr tail, and leaves
/// no partial output file in place.
pub async fn assemble(
    runner: &FfmpegRunner,
    clips: &[ComposedClip],
    audio_track: &Path,
    workspace: &RunWorkspace,
    output: &Path,
) -> MediaResult<RenderSummary> {
    if clips.is_empty() {
        return Err(MediaError::NoRenderableContent);
    }

    let audio_duration = probe_media(audio_track).await?.duration;

    let manifest_path = workspace.allocate("concat", "txt");
    tokio::fs::write(&manifest_path, build_concat_manifest(clips)).await?;

    let cmd = FfmpegCommand::new(output)
        .input_with_args(["-f", "concat", "-safe", "0"], &manifest_path)
        .input(audio_track)
        .output_args(["-map", "0:v:0", "-map", "1:a:0"])
        .video_codec("copy")
        .audio_codec("aac")
        .output_args(["-b:a", "192k"])
        .output_args(["-shortest", "-movflags", "+faststart"]);

    if let Err(e) = runner.run(&cmd).await {
        remove_partial_output(output).await;
        return Err(match e {
            MediaError::FfmpegFailed {
                message,
                stderr,
                exit_code,
            } => MediaError::RenderFailed {
                message,
                stderr,
                exit_code,
            },
            other => other,
        });
    }

    let container_duration = probe_media(output).await?.duration;
    let expected_video_duration: f64 = clips.iter().map(|c| c.entry.duration).sum();

    info!(
        output = %output.display(),
        clips = clips.len(),
        expected_video_duration,
        audio_duration,
        container_duration,
        "render complete"
    );

    Ok(RenderSummary {
        output_path: output.to_path_buf(),
        expected_video_duration,
        audio_duration,
        container_duration,
    })
}

/// Concat demuxer manifest. Single quotes in paths follow the
/// demuxer's quoting rules.
fn build_concat_manifest(clips: &[ComposedClip]) -> String {
    let mut manifest = String::new();
    for clip in clips {
        let escaped = clip.path.to_string_lossy().replace('\'', "'\\''");
        manifest.push_str("file '");
        manifest.push_str(&escaped);
        manifest.push_str("'\n");
    }
    manifest
}

/// A failed render must not leave a partial output file behind.
async fn remove_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => warn!(output = %output.display(), "removed partial output after failed render"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(output = %output.display(), error = %e, "failed to remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitclip_models::{Exercise, PlaylistEntry, Segment, SegmentLabel};
    use tempfile::TempDir;

    fn clip(path: &str, start: f64, end: f64) -> ComposedClip {
        ComposedClip {
            entry: PlaylistEntry::new(
                Segment::new(SegmentLabel::Core, start, end),
                Exercise {
                    name: "squat".to_string(),
                    media_url: "https://cdn.example.com/squat.mp4".to_string(),
                    narration_text: String::new(),
                },
            ),
            path: PathBuf::from(path),
        }
    }

    #[tokio::test]
    async fn test_no_clips_aborts_before_any_work() {
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::create(dir.path(), &fitclip_models::RunId::new())
            .await
            .unwrap();
        let output = dir.path().join("out.mp4");

        let err = assemble(
            &FfmpegRunner::new(),
            &[],
            Path::new("/nonexistent/audio.mp3"),
            &workspace,
            &output,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MediaError::NoRenderableContent));
        assert!(!output.exists());
        workspace.cleanup().await;
    }

    #[test]
    fn test_manifest_lists_clips_in_order() {
        let clips = [clip("/tmp/a.mp4", 0.0, 10.0), clip("/tmp/b.mp4", 10.0, 20.0)];
        let manifest = build_concat_manifest(&clips);
        assert_eq!(manifest, "file '/tmp/a.mp4'\nfile '/tmp/b.mp4'\n");
    }

    #[test]
    fn test_manifest_escapes_single_quotes() {
        let clips = [clip("/tmp/it's.mp4", 0.0, 10.0)];
        let manifest = build_concat_manifest(&clips);
        assert_eq!(manifest, "file '/tmp/it'\\''s.mp4'\n");
    }
}
