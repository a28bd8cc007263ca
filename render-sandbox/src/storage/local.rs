//! Filesystem-backed object store for development

use super::ObjectStore;
use crate::error::{RenderError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a key to a path under the root. Keys may only contain normal
    /// components.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(RenderError::UploadFailed(format!("invalid object key: {}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put_file(&self, key: &str, path: &Path, _content_type: &str) -> Result<String> {
        let target = self.resolve(key)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RenderError::UploadFailed(format!("{}: {}", parent.display(), e))
            })?;
        }
        tokio::fs::copy(path, &target)
            .await
            .map_err(|e| RenderError::UploadFailed(format!("{}: {}", target.display(), e)))?;

        let absolute = tokio::fs::canonicalize(&target).await.unwrap_or(target);
        Ok(format!("file://{}", absolute.display()))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let target = self.resolve(key)?;
        tokio::fs::read(&target)
            .await
            .map_err(|e| RenderError::UploadFailed(format!("{}: {}", target.display(), e)))
    }

    fn name(&self) -> &str {
        "local"
    }
}
