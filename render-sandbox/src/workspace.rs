//! Per-job workspace directories
//!
//! Every job gets its own directory under the jobs root, named with a random
//! UUID. The directory is the only host path the container can see, so two
//! jobs never share state. [`Workspace`] is an owning handle: releasing it
//! consumes it, and dropping it unreleased removes the directory synchronously
//! so cancelled or panicking jobs do not leak.

use crate::error::{RenderError, Result};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Directory name prefix for job workspaces
pub const WORKSPACE_PREFIX: &str = "render-job-";
/// Subdirectory receiving the submitted script
pub const SNIPPETS_DIR: &str = "snippets";
/// Subdirectory the renderer writes media into
pub const MEDIA_DIR: &str = "media";

/// Creates and destroys job workspaces under a single root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, uniquely named workspace.
    pub async fn acquire(&self) -> Result<Workspace> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| RenderError::workspace(&self.root, e))?;

        let path = self
            .root
            .join(format!("{}{}", WORKSPACE_PREFIX, Uuid::new_v4().simple()));

        // Non-recursive: an existing directory means a collision, never reuse.
        tokio::fs::create_dir(&path)
            .await
            .map_err(|e| RenderError::workspace(&path, e))?;

        // From here on the handle owns the directory and cleans it up on error.
        let mut workspace = Workspace::new(path);

        let canonical = tokio::fs::canonicalize(workspace.path())
            .await
            .map_err(|e| RenderError::workspace(workspace.path(), e))?;
        workspace.dir.path = canonical;

        for sub in [SNIPPETS_DIR, MEDIA_DIR] {
            let sub_path = workspace.path().join(sub);
            tokio::fs::create_dir(&sub_path)
                .await
                .map_err(|e| RenderError::workspace(&sub_path, e))?;
        }

        debug!(workspace = %workspace.path().display(), "Workspace acquired");
        Ok(workspace)
    }

    /// Remove a workspace. Succeeds if it is already gone.
    pub async fn release(&self, workspace: Workspace) -> io::Result<()> {
        workspace.release().await
    }

    /// Run `body` inside a fresh workspace and release it afterwards.
    ///
    /// The release runs whatever `body` returns. Acquisition failures are
    /// returned as `Err`; the body's own output is passed through untouched.
    pub async fn with_workspace<T, F, Fut>(&self, body: F) -> Result<T>
    where
        F: FnOnce(WorkspaceDir) -> Fut,
        Fut: Future<Output = T>,
    {
        let workspace = self.acquire().await?;
        let output = body(workspace.dir().clone()).await;
        let path = workspace.path().to_path_buf();
        if let Err(e) = workspace.release().await {
            if e.kind() == io::ErrorKind::PermissionDenied {
                error!(
                    workspace = %path.display(),
                    error = %e,
                    "Workspace leaked: container output is not removable by this user, \
                     enable RENDER_MATCH_WORKSPACE_OWNER"
                );
            } else {
                error!(workspace = %path.display(), error = %e, "Failed to remove workspace");
            }
        }
        Ok(output)
    }
}

/// Paths inside a workspace, freely cloneable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDir {
    path: PathBuf,
}

impl WorkspaceDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snippets_dir(&self) -> PathBuf {
        self.path.join(SNIPPETS_DIR)
    }

    pub fn media_dir(&self) -> PathBuf {
        self.path.join(MEDIA_DIR)
    }
}

/// Owning handle to a job workspace
#[derive(Debug)]
pub struct Workspace {
    dir: WorkspaceDir,
    released: bool,
}

impl Workspace {
    fn new(path: PathBuf) -> Self {
        Self {
            dir: WorkspaceDir { path },
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn dir(&self) -> &WorkspaceDir {
        &self.dir
    }

    /// Recursively remove the workspace.
    pub async fn release(mut self) -> io::Result<()> {
        let result = remove_dir_idempotent(self.dir.path()).await;
        self.released = true;
        if result.is_ok() {
            debug!(workspace = %self.dir.path().display(), "Workspace released");
        }
        result
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            workspace = %self.dir.path().display(),
            "Workspace dropped without release, removing"
        );
        match std::fs::remove_dir_all(self.dir.path()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                workspace = %self.dir.path().display(),
                error = %e,
                "Failed to remove dropped workspace"
            ),
        }
    }
}

async fn remove_dir_idempotent(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
