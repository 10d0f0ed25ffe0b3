//! Remote asset resolution: streaming downloads into the run workspace.

use futures::future::join_all;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use url::Url;

use fitclip_models::{PlaylistEntry, RunWarning};

use crate::error::{MediaError, MediaResult};
use crate::workspace::RunWorkspace;

/// Outcome of resolving one playlist entry: the local file when the
/// download succeeded, or an unresolved marker when it did not.
#[derive(Debug)]
pub struct ResolvedAsset {
    pub entry: PlaylistEntry,
    pub local_path: Option<PathBuf>,
}

impl ResolvedAsset {
    pub fn is_resolved(&self) -> bool {
        self.local_path.is_some()
    }
}

/// Streams each playlist entry's media to local storage, tolerating
/// per-item failure.
pub struct AssetResolver {
    client: reqwest::Client,
    max_parallel: usize,
}

impl AssetResolver {
    /// Build a resolver whose HTTP client enforces `fetch_timeout` per
    /// download.
    pub fn new(fetch_timeout: Duration, max_parallel: usize) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| MediaError::fetch_failed("<client>", e.to_string()))?;
        Ok(Self {
            client,
            max_parallel: max_parallel.max(1),
        })
    }

    /// Download every playlist entry's media into the workspace.
    ///
    /// Any network error or non-success response marks that entry
    /// unresolved with a warning and processing continues: partial
    /// asset availability is expected. Results preserve playlist order
    /// regardless of download completion order. Every destination path
    /// is registered for cleanup before the download starts.
    pub async fn resolve(
        &self,
        playlist: Vec<PlaylistEntry>,
        workspace: &RunWorkspace,
        warnings: &mut Vec<RunWarning>,
    ) -> Vec<ResolvedAsset> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));

        let futures: Vec<_> = playlist
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return (entry, None, Some("download pool closed".to_string()));
                        }
                    };

                    let extension = media_extension(&entry.exercise.media_url);
                    let dest = workspace.allocate(&format!("asset-{}", index), &extension);

                    match self.fetch(&entry.exercise.media_url, &dest).await {
                        Ok(()) => {
                            info!(
                                exercise = %entry.exercise.name,
                                path = %dest.display(),
                                "asset resolved"
                            );
                            (entry, Some(dest), None)
                        }
                        Err(e) => {
                            warn!(
                                exercise = %entry.exercise.name,
                                url = %entry.exercise.media_url,
                                error = %e,
                                "asset fetch failed, entry unresolved"
                            );
                            (entry, None, Some(e.to_string()))
                        }
                    }
                }
            })
            .collect();

        // join_all yields results in input order, so playlist order is
        // preserved whatever the completion order was.
        let mut resolved = Vec::with_capacity(futures.len());
        for (entry, local_path, failure) in join_all(futures).await {
            if let Some(reason) = failure {
                warnings.push(RunWarning::AssetFetch {
                    exercise: entry.exercise.name.clone(),
                    reason,
                });
            }
            resolved.push(ResolvedAsset { entry, local_path });
        }
        resolved
    }

    /// Stream one URL to `dest`.
    async fn fetch(&self, media_url: &str, dest: &Path) -> MediaResult<()> {
        let response = self
            .client
            .get(media_url)
            .send()
            .await
            .map_err(|e| MediaError::fetch_failed(media_url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(MediaError::fetch_failed(
                media_url,
                format!("HTTP {}", response.status()),
            ));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::fetch_failed(media_url, e.to_string()))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

/// File extension for the local copy, taken from the URL path when it
/// looks sane, `mp4` otherwise.
fn media_extension(media_url: &str) -> String {
    Url::parse(media_url)
        .ok()
        .and_then(|u| {
            u.path()
                .rsplit('/')
                .next()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext.to_ascii_lowercase())
        })
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "mp4".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitclip_models::{Exercise, Segment, SegmentLabel};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(name: &str, media_url: &str, start: f64, end: f64) -> PlaylistEntry {
        PlaylistEntry::new(
            Segment::new(SegmentLabel::Core, start, end),
            Exercise {
                name: name.to_string(),
                media_url: media_url.to_string(),
                narration_text: String::new(),
            },
        )
    }

    #[test]
    fn test_media_extension() {
        assert_eq!(media_extension("https://cdn.example.com/a/squat.mov"), "mov");
        assert_eq!(media_extension("https://cdn.example.com/squat"), "mp4");
        assert_eq!(media_extension("https://cdn.example.com/squat.x?q=1"), "x");
        assert_eq!(media_extension("not a url"), "mp4");
    }

    #[tokio::test]
    async fn test_resolve_preserves_order_across_mixed_outcomes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/good.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::create(dir.path(), &fitclip_models::RunId::new())
            .await
            .unwrap();

        let playlist = vec![
            entry("first", &format!("{}/good.mp4", server.uri()), 0.0, 10.0),
            entry("second", &format!("{}/missing.mp4", server.uri()), 10.0, 20.0),
            entry("third", &format!("{}/good.mp4", server.uri()), 20.0, 30.0),
        ];

        let resolver = AssetResolver::new(Duration::from_secs(5), 2).unwrap();
        let mut warnings = Vec::new();
        let resolved = resolver.resolve(playlist, &workspace, &mut warnings).await;

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].entry.exercise.name, "first");
        assert!(resolved[0].is_resolved());
        assert_eq!(resolved[1].entry.exercise.name, "second");
        assert!(!resolved[1].is_resolved());
        assert_eq!(resolved[2].entry.exercise.name, "third");
        assert!(resolved[2].is_resolved());

        let bytes = tokio::fs::read(resolved[0].local_path.as_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(bytes.len(), 2048);

        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            RunWarning::AssetFetch { exercise, .. } if exercise == "second"
        ));

        workspace.cleanup().await;
        assert!(!workspace.root().exists());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_per_item() {
        // Nothing listens on this port.
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::create(dir.path(), &fitclip_models::RunId::new())
            .await
            .unwrap();

        let playlist = vec![entry("lost", "http://127.0.0.1:1/lost.mp4", 0.0, 5.0)];
        let resolver = AssetResolver::new(Duration::from_secs(2), 1).unwrap();
        let mut warnings = Vec::new();
        let resolved = resolver.resolve(playlist, &workspace, &mut warnings).await;

        assert_eq!(resolved.len(), 1);
        assert!(!resolved[0].is_resolved());
        assert_eq!(warnings.len(), 1);
        workspace.cleanup().await;
    }
}
