//! Sandbox configuration loaded from the environment

use crate::limits::ResourceLimits;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything needed to build a render service
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Renderer image run for every job
    pub image: String,
    /// Engine binary, `docker` or a compatible CLI such as `podman`
    pub engine: String,
    pub jobs_root: PathBuf,
    pub limits: ResourceLimits,
    /// Run containers as the workspace owner so the host can remove what
    /// the renderer writes. On by default.
    pub match_workspace_owner: bool,
    /// `None` admits every job immediately
    pub max_concurrent_jobs: Option<usize>,
    pub artifact_extension: String,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// First segment of every object key
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local {
                dir: PathBuf::from("./artifacts"),
            },
            key_prefix: "videos".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    S3(S3Config),
    Local { dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    /// Falls back to the SDK's region provider chain when unset
    pub region: Option<String>,
    /// Custom endpoint (MinIO, R2, ...); switches to path-style addressing
    pub endpoint: Option<String>,
    /// Falls back to the SDK's credential provider chain when unset
    pub credentials: Option<StaticCredentials>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl SandboxConfig {
    /// Defaults for everything except the image and jobs root. Artifacts go
    /// to the local backend.
    pub fn new(image: impl Into<String>, jobs_root: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            engine: "docker".to_string(),
            jobs_root: jobs_root.into(),
            limits: ResourceLimits::default(),
            match_workspace_owner: true,
            max_concurrent_jobs: None,
            artifact_extension: "mp4".to_string(),
            storage: StorageConfig::default(),
        }
    }

    /// Load from process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let image = get("DOCKER_IMAGE").ok_or(ConfigError::Missing("DOCKER_IMAGE"))?;
        let mut config = Self::new(
            image,
            get("RENDER_JOBS_ROOT").unwrap_or_else(|| "./jobs".to_string()),
        );

        if let Some(engine) = get("CONTAINER_ENGINE") {
            config.engine = engine;
        }

        let defaults = ResourceLimits::default();
        let timeout_secs: u64 = parse_or(&get, "RENDER_TIMEOUT_SECS", defaults.max_duration.as_secs())?;
        if timeout_secs == 0 {
            return Err(invalid("RENDER_TIMEOUT_SECS", "0", "must be positive"));
        }
        config.limits = ResourceLimits {
            max_duration: Duration::from_secs(timeout_secs),
            memory: get("RENDER_MEMORY_LIMIT").or(defaults.memory),
            cpus: get("RENDER_CPU_LIMIT").or(defaults.cpus),
            pids: Some(parse_or(&get, "RENDER_PIDS_LIMIT", defaults.pids.unwrap_or(256))?),
            max_output_bytes: parse_or(&get, "RENDER_MAX_OUTPUT_BYTES", defaults.max_output_bytes)?,
        };

        config.match_workspace_owner = parse_bool(&get, "RENDER_MATCH_WORKSPACE_OWNER", true)?;

        let max_jobs: usize = parse_or(&get, "RENDER_MAX_CONCURRENT_JOBS", 0)?;
        config.max_concurrent_jobs = (max_jobs > 0).then_some(max_jobs);

        if let Some(ext) = get("ARTIFACT_EXTENSION") {
            config.artifact_extension = ext.trim_start_matches('.').to_string();
        }

        config.storage = storage_from_lookup(&get)?;
        Ok(config)
    }
}

fn storage_from_lookup<G>(get: &G) -> Result<StorageConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let key_prefix = get("STORAGE_KEY_PREFIX")
        .map(|p| p.trim_matches('/').to_string())
        .unwrap_or_else(|| "videos".to_string());

    let backend = match get("STORAGE_BACKEND")
        .unwrap_or_else(|| "s3".to_string())
        .to_ascii_lowercase()
        .as_str()
    {
        "s3" => {
            let credentials = match (get("AWS_ACCESS_KEY_ID"), get("AWS_SECRET_ACCESS_KEY")) {
                (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                    access_key_id,
                    secret_access_key,
                }),
                (None, None) => None,
                (Some(_), None) => return Err(ConfigError::Missing("AWS_SECRET_ACCESS_KEY")),
                (None, Some(_)) => return Err(ConfigError::Missing("AWS_ACCESS_KEY_ID")),
            };
            StorageBackend::S3(S3Config {
                bucket: get("S3_BUCKET_NAME").ok_or(ConfigError::Missing("S3_BUCKET_NAME"))?,
                region: get("AWS_REGION"),
                endpoint: get("S3_ENDPOINT"),
                credentials,
            })
        }
        "local" => StorageBackend::Local {
            dir: PathBuf::from(
                get("LOCAL_STORAGE_DIR").unwrap_or_else(|| "./artifacts".to_string()),
            ),
        },
        other => return Err(invalid("STORAGE_BACKEND", other, "expected `s3` or `local`")),
    };

    Ok(StorageConfig { backend, key_prefix })
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<G, T>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(invalid(key, &v, "expected a boolean")),
        },
    }
}
