//! In-memory object store

use async_trait::async_trait;
use render_sandbox::{ObjectStore, RenderError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following upload fail.
    pub fn fail_uploads(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RenderError::UploadFailed("bucket unreachable".to_string()));
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RenderError::UploadFailed(e.to_string()))?;
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(
                key.to_string(),
                StoredObject {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
        }
        Ok(format!("memory://{}", key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.object(key)
            .map(|o| o.bytes)
            .ok_or_else(|| RenderError::UploadFailed(format!("no such key: {}", key)))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
