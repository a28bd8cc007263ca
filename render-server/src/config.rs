//! Server configuration

use render_sandbox::{ConfigError, SandboxConfig};
use std::fmt;
use std::str::FromStr;

/// Largest accepted request body by default
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub sandbox: SandboxConfig,
}

impl ServerConfig {
    pub fn new(sandbox: SandboxConfig) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            sandbox,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let sandbox = SandboxConfig::from_lookup(&get)?;
        let mut config = Self::new(sandbox);

        if let Some(host) = get("RENDER_HOST") {
            config.host = host;
        }
        if let Some((key, raw)) = get("RENDER_PORT")
            .map(|v| ("RENDER_PORT", v))
            .or_else(|| get("PORT").map(|v| ("PORT", v)))
        {
            config.port = parse(key, &raw)?;
        }
        if let Some(raw) = get("RENDER_MAX_BODY_BYTES") {
            config.max_body_bytes = parse("RENDER_MAX_BODY_BYTES", &raw)?;
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
