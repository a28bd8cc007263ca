//! Common test utilities shared across integration suites

#[cfg(unix)]
pub mod fake_engine;
pub mod fake_runtime;
pub mod memory_store;

#[cfg(unix)]
pub use fake_engine::*;
pub use fake_runtime::*;
pub use memory_store::*;

use render_sandbox::{ContainerRuntime, ObjectStore, RenderService, SandboxConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Setup logging for tests
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("render_sandbox=debug,render_server=debug")
        .with_test_writer()
        .try_init();
}

/// A render service over a private jobs root and in-memory storage
pub struct TestEnv {
    _dir: TempDir,
    pub jobs_root: PathBuf,
    pub runtime: Arc<FakeRuntime>,
    pub store: Arc<MemoryStore>,
    pub service: RenderService,
}

impl TestEnv {
    pub fn new(runtime: FakeRuntime) -> Self {
        Self::with_config(runtime, |_| {})
    }

    pub fn with_config(runtime: FakeRuntime, tweak: impl FnOnce(&mut SandboxConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let jobs_root = dir.path().join("jobs");
        let mut config = SandboxConfig::new("render-test-image", &jobs_root);
        tweak(&mut config);

        let runtime = Arc::new(runtime);
        let store = Arc::new(MemoryStore::new());
        let service = RenderService::new(
            &config,
            runtime.clone() as Arc<dyn ContainerRuntime>,
            store.clone() as Arc<dyn ObjectStore>,
        );
        Self {
            _dir: dir,
            jobs_root,
            runtime,
            store,
            service,
        }
    }

    /// Entries left under the jobs root
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        list_dir(&self.jobs_root)
    }
}

/// Directory entries, or nothing if the directory does not exist
pub fn list_dir(path: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(path) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}
