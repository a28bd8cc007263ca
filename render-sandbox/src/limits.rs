//! Resource limits applied to every sandboxed render

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource limits for one container run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Wall-clock budget before the container is killed
    pub max_duration: Duration,

    /// Memory limit in engine syntax (`512m`, `2g`)
    pub memory: Option<String>,

    /// CPU quota in engine syntax (`1.5`)
    pub cpus: Option<String>,

    /// Maximum number of processes inside the container
    pub pids: Option<u32>,

    /// Cap on captured bytes per output stream; the tail is kept
    pub max_output_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(300), // 5 minutes
            memory: Some("2g".to_string()),
            cpus: Some("2".to_string()),
            pids: Some(256),
            max_output_bytes: 4 * 1024 * 1024,
        }
    }
}

impl ResourceLimits {
    /// Tight limits used by tests and local smoke runs
    pub fn strict() -> Self {
        Self {
            max_duration: Duration::from_secs(30),
            memory: Some("512m".to_string()),
            cpus: Some("1".to_string()),
            pids: Some(64),
            max_output_bytes: 256 * 1024,
        }
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Engine flags enforcing these limits
    pub fn container_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(memory) = &self.memory {
            args.push("--memory".to_string());
            args.push(memory.clone());
            // No swap on top of the memory limit.
            args.push("--memory-swap".to_string());
            args.push(memory.clone());
        }
        if let Some(cpus) = &self.cpus {
            args.push("--cpus".to_string());
            args.push(cpus.clone());
        }
        if let Some(pids) = self.pids {
            args.push("--pids-limit".to_string());
            args.push(pids.to_string());
        }
        args
    }
}
