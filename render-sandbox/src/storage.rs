//! Artifact upload to durable object storage
//!
//! [`StorageUploader`] owns key naming and content types; the backends behind
//! [`ObjectStore`] only move bytes.

mod local;
mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{RenderError, Result};
use crate::locator::Artifact;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Fallback when an artifact has no usable name
const DEFAULT_OBJECT_NAME: &str = "artifact";

/// Where an uploaded artifact can be found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReference {
    pub key: String,
    pub uri: String,
}

/// Storage backend capability
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream the file at `path` to `key` and return its URI.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<String>;

    /// Read back a stored object.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    fn name(&self) -> &str;
}

/// Build the store described by `config`.
pub async fn store_from_config(config: &StorageConfig) -> Arc<dyn ObjectStore> {
    let store: Arc<dyn ObjectStore> = match &config.backend {
        StorageBackend::S3(s3) => Arc::new(S3Store::connect(s3).await),
        StorageBackend::Local { dir } => Arc::new(LocalStore::new(dir)),
    };
    info!(backend = store.name(), "Object store ready");
    store
}

#[derive(Clone)]
pub struct StorageUploader {
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
}

impl std::fmt::Debug for StorageUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageUploader")
            .field("store", &self.store.name())
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl StorageUploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            key_prefix: "videos".to_string(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Upload `artifact` under a fresh unique key.
    pub async fn upload(&self, artifact: &Artifact) -> Result<UploadReference> {
        if !tokio::fs::try_exists(&artifact.path).await.unwrap_or(false) {
            return Err(RenderError::UploadFailed(format!(
                "artifact missing before upload: {}",
                artifact.path.display()
            )));
        }

        let key = object_key(
            &self.key_prefix,
            Uuid::new_v4(),
            &artifact.name,
            artifact.extension(),
        );
        let content_type = mime_guess::from_path(&artifact.path)
            .first_or_octet_stream()
            .to_string();

        debug!(key = %key, content_type = %content_type, bytes = artifact.size_bytes, "Uploading artifact");
        let uri = self.store.put_file(&key, &artifact.path, &content_type).await?;
        info!(key = %key, backend = self.store.name(), "Artifact uploaded");

        Ok(UploadReference { key, uri })
    }
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<prefix>/<id>/<sanitized name><.ext>`; the prefix segment is omitted when
/// empty.
pub fn object_key(prefix: &str, id: Uuid, name: &str, extension: Option<&str>) -> String {
    let mut name = sanitize_name(name);
    if name.is_empty() {
        name = DEFAULT_OBJECT_NAME.to_string();
    }
    let ext = extension
        .map(|e| format!(".{}", sanitize_name(e)))
        .unwrap_or_default();
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/{}{}", id, name, ext)
    } else {
        format!("{}/{}/{}{}", prefix, id, name, ext)
    }
}
