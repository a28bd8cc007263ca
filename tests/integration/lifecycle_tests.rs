//! Job lifecycle through the orchestrator
//!
//! Every job must leave the jobs root as it found it, whatever the outcome.

use crate::common::*;
use render_common::{Quality, RenderJobRequest};
use render_sandbox::{
    ContainerRuntime, ErrorKind, JobStage, ObjectStore, RenderService, SandboxConfig,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

fn request(code: &str) -> RenderJobRequest {
    RenderJobRequest::new(code, Quality::Medium)
}

#[tokio::test]
async fn test_successful_job_uploads_and_cleans_up() {
    setup_test_logging();
    let env = TestEnv::new(FakeRuntime::echo("CircleScene"));

    let outcome = env
        .service
        .render(request("class CircleScene(Scene): ..."))
        .await
        .unwrap();

    assert!(outcome.reference.key.starts_with("videos/"));
    assert!(outcome.reference.key.ends_with("/CircleScene.mp4"));
    assert_eq!(outcome.reference.uri, format!("memory://{}", outcome.reference.key));
    let stored = env.store.object(&outcome.reference.key).unwrap();
    assert_eq!(stored.bytes, b"class CircleScene(Scene): ...");
    assert_eq!(stored.content_type, "video/mp4");
    assert!(env.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_jobs_root_empty_after_mixed_batch() {
    setup_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let jobs_root = dir.path().join("jobs");
    let config = SandboxConfig::new("render-test-image", &jobs_root);

    let healthy_store = Arc::new(MemoryStore::new());
    let broken_store = Arc::new(MemoryStore::new());
    broken_store.fail_uploads();

    let cases: Vec<(Behavior, Arc<MemoryStore>, Option<ErrorKind>)> = vec![
        (
            Behavior::EchoScript {
                name: "Ok".to_string(),
            },
            healthy_store.clone(),
            None,
        ),
        (
            Behavior::Fail {
                code: 1,
                stderr: "SyntaxError".to_string(),
            },
            healthy_store.clone(),
            Some(ErrorKind::ScriptExecutionFailed),
        ),
        (
            Behavior::NoArtifact,
            healthy_store.clone(),
            Some(ErrorKind::ArtifactNotFound),
        ),
        (
            Behavior::TimedOut,
            healthy_store.clone(),
            Some(ErrorKind::ExecutionTimeout),
        ),
        (
            Behavior::Unavailable("daemon down".to_string()),
            healthy_store.clone(),
            Some(ErrorKind::SandboxUnavailable),
        ),
        (
            Behavior::EchoScript {
                name: "Lost".to_string(),
            },
            broken_store.clone(),
            Some(ErrorKind::UploadFailed),
        ),
    ];

    let mut jobs = JoinSet::new();
    for (i, (behavior, store, expected)) in cases.into_iter().enumerate() {
        let service = RenderService::new(
            &config,
            Arc::new(FakeRuntime::new(behavior).with_delay(Duration::from_millis(20)))
                as Arc<dyn ContainerRuntime>,
            store as Arc<dyn ObjectStore>,
        );
        jobs.spawn(async move {
            let result = service.render(request(&format!("job {}", i))).await;
            (result.err().map(|f| f.kind()), expected)
        });
    }

    let mut finished = 0;
    while let Some(joined) = jobs.join_next().await {
        let (actual, expected) = joined.unwrap();
        assert_eq!(actual, expected);
        finished += 1;
    }
    assert_eq!(finished, 6);
    assert!(list_dir(&jobs_root).is_empty());
    assert_eq!(healthy_store.len(), 1);
    assert!(broken_store.is_empty());
}

#[tokio::test]
async fn test_concurrent_jobs_are_isolated() {
    let env = TestEnv::new(FakeRuntime::echo("Scene").with_delay(Duration::from_millis(100)));

    let mut jobs = JoinSet::new();
    for i in 0..8 {
        let service = env.service.clone();
        let code = format!("# job {}\nclass Scene: pass\n", i);
        jobs.spawn(async move {
            let outcome = service.render(request(&code)).await.unwrap();
            (code, outcome)
        });
    }

    let mut keys = HashSet::new();
    while let Some(joined) = jobs.join_next().await {
        let (code, outcome) = joined.unwrap();
        // Each artifact is a copy of the script found in its own workspace.
        let stored = env.store.object(&outcome.reference.key).unwrap();
        assert_eq!(String::from_utf8(stored.bytes).unwrap(), code);
        assert!(keys.insert(outcome.reference.key));
    }

    let observed = env.runtime.observed();
    assert_eq!(observed.len(), 8);
    let workspaces: HashSet<_> = observed.iter().map(|o| o.workspace.clone()).collect();
    assert_eq!(workspaces.len(), 8);
    for run in &observed {
        assert_eq!(run.entries, vec!["media".to_string(), "snippets".to_string()]);
        assert!(run.workspace.starts_with(env.jobs_root.canonicalize().unwrap()));
    }
    assert!(env.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_script_failure_carries_stderr() {
    let env = TestEnv::new(FakeRuntime::new(Behavior::Fail {
        code: 1,
        stderr: "NameError: name 'Circl' is not defined".to_string(),
    }));

    let failure = env.service.render(request("Circl()")).await.unwrap_err();

    assert_eq!(failure.kind(), ErrorKind::ScriptExecutionFailed);
    assert_eq!(failure.stage, JobStage::ScriptWritten);
    assert!(failure.message().contains("NameError"));
    assert!(failure.message().contains("exit code 1"));
    assert!(failure.logs.unwrap().stderr.contains("Circl"));
    assert!(env.store.is_empty());
    assert!(env.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_clean_exit_without_artifact() {
    let env = TestEnv::new(FakeRuntime::new(Behavior::NoArtifact));

    let failure = env.service.render(request("pass")).await.unwrap_err();

    assert_eq!(failure.kind(), ErrorKind::ArtifactNotFound);
    assert_eq!(failure.stage, JobStage::Executed);
    assert!(failure.message().contains(".mp4"));
    assert!(env.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_upload_failure_is_distinct_and_keeps_logs() {
    let env = TestEnv::new(FakeRuntime::echo("Scene"));
    env.store.fail_uploads();

    let failure = env.service.render(request("class Scene: pass")).await.unwrap_err();

    assert_eq!(failure.kind(), ErrorKind::UploadFailed);
    assert_eq!(failure.stage, JobStage::ArtifactLocated);
    assert!(failure.logs.unwrap().stdout.contains("File ready"));
    assert!(env.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_engine_unavailable_before_run() {
    let env = TestEnv::new(FakeRuntime::new(Behavior::Unavailable(
        "Cannot connect to the Docker daemon".to_string(),
    )));

    let failure = env.service.render(request("pass")).await.unwrap_err();

    assert_eq!(failure.kind(), ErrorKind::SandboxUnavailable);
    assert!(failure.logs.is_none());
    assert!(failure.kind().is_transient());
    assert!(env.leftover_workspaces().is_empty());
}

#[tokio::test]
async fn test_quality_and_script_reach_runtime() {
    let env = TestEnv::new(FakeRuntime::echo("Scene"));
    let code = "from manim import *\n\nclass Scene(Scene):\n    pass\n";

    env.service
        .render(RenderJobRequest::new(code, Quality::High))
        .await
        .unwrap();

    let observed = env.runtime.observed();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].quality_flag, "-qh");
    assert_eq!(observed[0].script, code);
}

#[tokio::test]
async fn test_unwritable_jobs_root_fails_workspace_creation() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("jobs");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let env = TestEnv::with_config(FakeRuntime::echo("Scene"), |config| {
        config.jobs_root = blocker.clone();
    });

    let failure = env.service.render(request("pass")).await.unwrap_err();
    assert_eq!(failure.kind(), ErrorKind::WorkspaceCreation);
    assert_eq!(failure.stage, JobStage::Validated);
    assert!(env.runtime.observed().is_empty());
}
