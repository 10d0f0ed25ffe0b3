//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Run-level configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory receiving per-run temp workspaces.
    pub work_dir: PathBuf,
    /// Canonical output frame width in pixels.
    pub frame_width: u32,
    /// Deadline per asset download.
    pub fetch_timeout: Duration,
    /// Deadline per FFmpeg invocation.
    pub ffmpeg_timeout: Duration,
    /// Deadline for the whole run.
    pub run_timeout: Duration,
    /// Maximum concurrent downloads.
    pub max_fetch_parallel: usize,
    /// Maximum concurrent compose renders.
    pub max_compose_parallel: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/fitclip"),
            frame_width: 640,
            fetch_timeout: Duration::from_secs(120),
            ffmpeg_timeout: Duration::from_secs(300),
            run_timeout: Duration::from_secs(1800),
            max_fetch_parallel: 2,
            max_compose_parallel: 4,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("FITCLIP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            frame_width: env_parsed("FITCLIP_FRAME_WIDTH").unwrap_or(defaults.frame_width),
            fetch_timeout: env_parsed("FITCLIP_FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            ffmpeg_timeout: env_parsed("FITCLIP_FFMPEG_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.ffmpeg_timeout),
            run_timeout: env_parsed("FITCLIP_RUN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.run_timeout),
            max_fetch_parallel: env_parsed("FITCLIP_MAX_FETCH_PARALLEL")
                .unwrap_or(defaults.max_fetch_parallel),
            max_compose_parallel: env_parsed("FITCLIP_MAX_COMPOSE_PARALLEL")
                .unwrap_or(defaults.max_compose_parallel),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = PipelineConfig::default();
        assert!(config.frame_width > 0);
        assert!(config.max_fetch_parallel > 0);
        assert!(config.run_timeout > config.ffmpeg_timeout);
    }
}
