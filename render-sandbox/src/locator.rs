//! Finds the rendered media file inside a workspace
//!
//! The search is a plain recursive walk for a file extension. Symbolic links
//! are never followed or returned: the sandboxed script controls the
//! workspace contents and could otherwise point the uploader at host files.
//!
//! When several files match, the newest modification time wins and ties go
//! to the lexicographically smallest path, so the choice never depends on
//! directory iteration order.

use crate::error::{RenderError, Result};
use crate::workspace::WorkspaceDir;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Directory names never searched; the renderer leaves per-animation
/// fragments there that share the final file's extension.
pub const IGNORED_DIRS: &[&str] = &["partial_movie_files"];

/// A rendered media file found in a workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    /// Identifying name inferred from the file stem
    pub name: String,
    pub size_bytes: u64,
}

impl Artifact {
    /// Extension without the leading dot, if any
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    extension: String,
}

impl Default for ArtifactLocator {
    fn default() -> Self {
        Self::new("mp4")
    }
}

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
}

impl ArtifactLocator {
    pub fn new(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    /// Locate the artifact produced in `workspace`.
    pub async fn locate(&self, workspace: &WorkspaceDir) -> Result<Artifact> {
        let media = workspace.media_dir();
        let search_root = if tokio::fs::symlink_metadata(&media)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            media
        } else {
            workspace.path().to_path_buf()
        };

        let not_found = || RenderError::ArtifactNotFound {
            extension: self.extension.clone(),
            searched: search_root.clone(),
        };

        let candidates = self.collect(&search_root).await.map_err(|e| {
            debug!(error = %e, "Artifact search failed");
            not_found()
        })?;
        debug!(
            root = %search_root.display(),
            candidates = candidates.len(),
            "Artifact search finished"
        );

        let chosen = select(candidates).ok_or_else(not_found)?;
        let name = chosen
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "artifact".to_string());

        Ok(Artifact {
            path: chosen.path,
            name,
            size_bytes: chosen.size,
        })
    }

    async fn collect(&self, root: &Path) -> io::Result<Vec<Candidate>> {
        let mut found = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                // file_type() does not follow symlinks.
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    if !self.is_ignored(&path) {
                        pending.push(path);
                    }
                } else if file_type.is_file() && self.matches(&path) {
                    let meta = entry.metadata().await?;
                    found.push(Candidate {
                        path,
                        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                        size: meta.len(),
                    });
                }
            }
        }
        Ok(found)
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    fn is_ignored(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| IGNORED_DIRS.iter().any(|d| *d == n))
            .unwrap_or(false)
    }
}

/// Newest first, then smallest path.
fn select(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.into_iter().min_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.path.cmp(&b.path))
    })
}
