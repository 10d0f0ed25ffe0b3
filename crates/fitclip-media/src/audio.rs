//! Waveform extraction for analysis.
//!
//! Converts any FFmpeg-decodable input into mono 32-bit float PCM at
//! the analysis sample rate, then loads the raw samples. The analysis
//! crate itself never performs file I/O; this is the collaborator that
//! hands it a decoded waveform.

use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::workspace::RunWorkspace;

/// Sample rate used for waveform analysis.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;

/// Decode `input` to mono f32 samples at [`ANALYSIS_SAMPLE_RATE`].
///
/// The intermediate PCM file lives in the run workspace and is cleaned
/// up with everything else.
pub async fn extract_waveform(
    input: &Path,
    workspace: &RunWorkspace,
    runner: &FfmpegRunner,
) -> MediaResult<Vec<f32>> {
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let pcm_path = workspace.allocate("waveform", "f32le");

    let cmd = FfmpegCommand::new(&pcm_path)
        .input(input)
        .output_args(["-vn", "-ac", "1"])
        .output_arg("-ar")
        .output_arg(ANALYSIS_SAMPLE_RATE.to_string())
        .output_args(["-f", "f32le"]);

    runner.run(&cmd).await.map_err(|e| match e {
        MediaError::FfmpegFailed {
            message, stderr, ..
        } => MediaError::decode_failed(format!(
            "{}{}",
            message,
            stderr.map(|s| format!(": {}", s)).unwrap_or_default()
        )),
        other => other,
    })?;

    let samples = load_samples(&pcm_path).await?;
    if samples.is_empty() {
        return Err(MediaError::decode_failed("no audio data in input"));
    }

    debug!(
        samples = samples.len(),
        seconds = samples.len() as f64 / ANALYSIS_SAMPLE_RATE as f64,
        "waveform extracted"
    );

    Ok(samples)
}

/// Load raw f32le samples from a file.
async fn load_samples(path: &Path) -> MediaResult<Vec<f32>> {
    let bytes = tokio::fs::read(path).await?;

    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_samples_empty_file() {
        let temp = NamedTempFile::new().unwrap();
        let samples = load_samples(temp.path()).await.unwrap();
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_load_samples_with_data() {
        let temp = NamedTempFile::new().unwrap();

        let test_samples: Vec<f32> = vec![0.0, 0.5, 1.0, -1.0];
        let bytes: Vec<u8> = test_samples.iter().flat_map(|f| f.to_le_bytes()).collect();
        tokio::fs::write(temp.path(), &bytes).await.unwrap();

        let loaded = load_samples(temp.path()).await.unwrap();
        assert_eq!(loaded.len(), 4);
        assert!((loaded[1] - 0.5).abs() < 1e-6);
        assert!((loaded[3] + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_missing_input_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let workspace = RunWorkspace::create(dir.path(), &fitclip_models::RunId::new())
            .await
            .unwrap();
        let err = extract_waveform(
            Path::new("/nonexistent/audio.mp3"),
            &workspace,
            &FfmpegRunner::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
        workspace.cleanup().await;
    }
}
