//! Run-scoped temporary storage with guaranteed cleanup.
//!
//! Every file a run creates on disk is registered here the moment its
//! path is allocated, before the first byte is written. Cleanup runs
//! exactly once per workspace, deletes every registered file, and
//! tolerates deletes that fail (a handle still holding a lock, a file
//! that never came into existence) by logging and moving on.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use fitclip_models::RunId;

use crate::error::MediaResult;

/// One run's private temp directory plus the registry of files to
/// delete when the run ends, however it ends.
pub struct RunWorkspace {
    root: PathBuf,
    registered: Mutex<Vec<PathBuf>>,
    cleaned: AtomicBool,
}

impl RunWorkspace {
    /// Create the workspace directory for one run under `work_dir`.
    ///
    /// The directory name carries the run id, so concurrent runs under
    /// the same work dir never collide.
    pub async fn create(work_dir: &Path, run_id: &RunId) -> MediaResult<Self> {
        let root = work_dir.join(format!("run-{}", run_id));
        tokio::fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "run workspace created");
        Ok(Self {
            root,
            registered: Mutex::new(Vec::new()),
            cleaned: AtomicBool::new(false),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a uniquely named file path inside the workspace and
    /// register it for cleanup. The file need not come into existence;
    /// cleanup tolerates both outcomes.
    pub fn allocate(&self, prefix: &str, extension: &str) -> PathBuf {
        let path = self
            .root
            .join(format!("{}-{}.{}", prefix, Uuid::new_v4(), extension));
        self.register(path.clone());
        path
    }

    /// Register an externally created file for cleanup.
    pub fn register(&self, path: PathBuf) {
        self.lock_registry().push(path);
    }

    /// Number of files currently registered.
    pub fn registered_count(&self) -> usize {
        self.lock_registry().len()
    }

    /// Delete every registered file and the workspace directory.
    ///
    /// Runs at most once; later calls are no-ops. Individual delete
    /// failures are logged and skipped, never propagated: cleanup is the
    /// one step that must not fail the run it is cleaning up after.
    pub async fn cleanup(&self) {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            return;
        }

        let files = std::mem::take(&mut *self.lock_registry());
        for path in files {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "removed temp asset"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove temp asset")
                }
            }
        }

        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(root = %self.root.display(), error = %e, "failed to remove workspace dir");
            }
        }
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.registered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for RunWorkspace {
    /// Backstop for abandoned workspaces. The pipeline calls
    /// [`RunWorkspace::cleanup`] explicitly on every exit path; this
    /// only fires if a workspace is dropped without one.
    fn drop(&mut self) {
        if !self.cleaned.load(Ordering::SeqCst) {
            if let Err(e) = std::fs::remove_dir_all(&self.root) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(root = %self.root.display(), error = %e, "workspace left behind");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_cleanup_removes_everything() {
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::create(dir.path(), &RunId::new()).await.unwrap();

        let a = workspace.allocate("asset", "mp4");
        let b = workspace.allocate("clip", "mp4");
        tokio::fs::write(&a, b"a").await.unwrap();
        tokio::fs::write(&b, b"b").await.unwrap();
        assert_eq!(workspace.registered_count(), 2);

        workspace.cleanup().await;

        assert!(!a.exists());
        assert!(!b.exists());
        assert!(!workspace.root().exists());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_never_created_files() {
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::create(dir.path(), &RunId::new()).await.unwrap();

        // Allocated but never written.
        let _ = workspace.allocate("asset", "mp4");
        workspace.cleanup().await;
        assert!(!workspace.root().exists());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::create(dir.path(), &RunId::new()).await.unwrap();
        let file = workspace.allocate("asset", "mp4");
        tokio::fs::write(&file, b"x").await.unwrap();

        workspace.cleanup().await;
        workspace.cleanup().await;
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let first = RunWorkspace::create(dir.path(), &RunId::new()).await.unwrap();
        let second = RunWorkspace::create(dir.path(), &RunId::new()).await.unwrap();
        assert_ne!(first.root(), second.root());

        let kept = second.allocate("asset", "mp4");
        tokio::fs::write(&kept, b"x").await.unwrap();

        first.cleanup().await;
        assert!(kept.exists(), "cleanup of one run must not touch another");
        second.cleanup().await;
    }

    #[tokio::test]
    async fn test_drop_backstop_removes_dir() {
        let dir = TempDir::new().unwrap();
        let root = {
            let workspace = RunWorkspace::create(dir.path(), &RunId::new()).await.unwrap();
            workspace.root().to_path_buf()
        };
        assert!(!root.exists());
    }
}
