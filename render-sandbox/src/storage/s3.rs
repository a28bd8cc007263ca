//! S3-compatible object store

use super::ObjectStore;
use crate::config::S3Config;
use crate::error::{RenderError, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::debug;

/// Provider name recorded on static credentials
const CREDENTIALS_SOURCE: &str = "render-sandbox-env";

#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from `config`. Region and credentials not given
    /// explicitly come from the SDK's default provider chains.
    pub async fn connect(config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(creds) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                CREDENTIALS_SOURCE,
            ));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            // Self-hosted endpoints rarely support virtual-hosted buckets.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }

    pub fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<String> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| RenderError::UploadFailed(format!("{}: {}", path.display(), e)))?;

        debug!(bucket = %self.bucket, key = %key, "PutObject");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| RenderError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(self.uri(key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| RenderError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| RenderError::UploadFailed(e.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }

    fn name(&self) -> &str {
        "s3"
    }
}
