//! Persists submitted source into a workspace

use crate::error::{RenderError, Result};
use crate::workspace::{WorkspaceDir, SNIPPETS_DIR};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// File name the container command expects
pub const SCRIPT_FILE_NAME: &str = "scene.py";

/// Location of a written script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPath {
    /// Absolute path on the host
    pub host: PathBuf,
    /// Path relative to the workspace root
    pub relative: PathBuf,
}

/// Writes source code verbatim. Never parses or inspects it.
#[derive(Debug, Clone)]
pub struct ScriptWriter {
    file_name: String,
}

impl Default for ScriptWriter {
    fn default() -> Self {
        Self {
            file_name: SCRIPT_FILE_NAME.to_string(),
        }
    }
}

impl ScriptWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn write(&self, workspace: &WorkspaceDir, source: &str) -> Result<ScriptPath> {
        let relative = PathBuf::from(SNIPPETS_DIR).join(&self.file_name);
        let host = workspace.path().join(&relative);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&host)
            .await
            .map_err(|e| RenderError::workspace(&host, e))?;
        file.write_all(source.as_bytes())
            .await
            .map_err(|e| RenderError::workspace(&host, e))?;
        file.flush()
            .await
            .map_err(|e| RenderError::workspace(&host, e))?;

        tracing::debug!(script = %host.display(), bytes = source.len(), "Script written");
        Ok(ScriptPath { host, relative })
    }
}
