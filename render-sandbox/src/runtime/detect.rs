//! Container engine availability checks
//!
//! Distinguishes "binary missing" from "daemon not answering" so operators
//! get an actionable hint instead of a generic launch failure.

use std::fmt;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Container engine availability status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// Binary found and daemon responding.
    Available { version: String },
    /// Engine binary not found on PATH.
    NotInstalled,
    /// Binary found but `info` failed or hung.
    NotRunning { detail: String },
}

impl EngineStatus {
    /// Returns true if the engine is ready to run containers.
    pub fn is_ok(&self) -> bool {
        matches!(self, EngineStatus::Available { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineStatus::Available { .. } => "available",
            EngineStatus::NotInstalled => "not installed",
            EngineStatus::NotRunning { .. } => "not running",
        }
    }

    /// Operator guidance for an unavailable engine.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            EngineStatus::Available { .. } => None,
            EngineStatus::NotInstalled => Some(
                "Install Docker Engine (https://docs.docker.com/engine/install/) \
                 or Podman (https://podman.io/docs/installation), or set CONTAINER_ENGINE",
            ),
            EngineStatus::NotRunning { .. } => Some(
                "Start the daemon (sudo systemctl start docker, or \
                 systemctl --user start podman.socket) and check socket permissions",
            ),
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Available { version } => write!(f, "available ({})", version),
            EngineStatus::NotInstalled => f.write_str("not installed"),
            EngineStatus::NotRunning { detail } => write!(f, "not running: {}", detail),
        }
    }
}

/// Check whether `engine` is installed and its daemon answers.
pub async fn probe_engine(engine: &str) -> EngineStatus {
    let info = Command::new(engine)
        .arg("info")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, info).await {
        Err(_) => EngineStatus::NotRunning {
            detail: format!("'{} info' did not answer within {}s", engine, PROBE_TIMEOUT.as_secs()),
        },
        Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => EngineStatus::NotInstalled,
        Ok(Err(e)) => EngineStatus::NotRunning {
            detail: e.to_string(),
        },
        Ok(Ok(output)) if !output.status.success() => EngineStatus::NotRunning {
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        },
        Ok(Ok(_)) => EngineStatus::Available {
            version: engine_version(engine).await,
        },
    }
}

async fn engine_version(engine: &str) -> String {
    let output = Command::new(engine)
        .arg("--version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();
    match tokio::time::timeout(PROBE_TIMEOUT, output).await {
        Ok(Ok(output)) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
        _ => "unknown version".to_string(),
    }
}
