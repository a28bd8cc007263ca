//! Artifact location and upload round trips

use crate::common::*;
use assert_matches::assert_matches;
use render_sandbox::{
    ArtifactLocator, LocalStore, RenderError, StorageUploader, WorkspaceManager,
};
use std::sync::Arc;

#[tokio::test]
async fn test_locator_returns_single_rendered_video() {
    let root = tempfile::tempdir().unwrap();
    let workspace = WorkspaceManager::new(root.path()).acquire().await.unwrap();
    let video = workspace
        .dir()
        .media_dir()
        .join("videos/scene/1080p60/SquareToCircle.mp4");
    std::fs::create_dir_all(video.parent().unwrap()).unwrap();
    std::fs::write(&video, b"mp4").unwrap();
    std::fs::write(workspace.dir().media_dir().join("notes.txt"), b"ignored").unwrap();

    let artifact = ArtifactLocator::default()
        .locate(workspace.dir())
        .await
        .unwrap();

    assert_eq!(artifact.path, video);
    assert_eq!(artifact.name, "SquareToCircle");
    workspace.release().await.unwrap();
}

#[tokio::test]
async fn test_locator_fails_on_empty_media() {
    let root = tempfile::tempdir().unwrap();
    let workspace = WorkspaceManager::new(root.path()).acquire().await.unwrap();

    assert_matches!(
        ArtifactLocator::default().locate(workspace.dir()).await,
        Err(RenderError::ArtifactNotFound { .. })
    );
    workspace.release().await.unwrap();
}

#[tokio::test]
async fn test_local_round_trip_is_byte_identical() {
    let root = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();
    let workspace = WorkspaceManager::new(root.path()).acquire().await.unwrap();

    let payload: Vec<u8> = (0..256 * 1024u32).map(|i| (i * 31 % 251) as u8).collect();
    let video = workspace.dir().media_dir().join("Final Cut.mp4");
    std::fs::write(&video, &payload).unwrap();

    let artifact = ArtifactLocator::default()
        .locate(workspace.dir())
        .await
        .unwrap();
    let uploader = StorageUploader::new(Arc::new(LocalStore::new(store_dir.path())));
    let reference = uploader.upload(&artifact).await.unwrap();

    assert!(reference.key.ends_with("/Final_Cut.mp4"));
    let stored = uploader.store().get(&reference.key).await.unwrap();
    assert_eq!(stored, payload);

    workspace.release().await.unwrap();
}

#[tokio::test]
async fn test_memory_round_trip_records_content_type() {
    let root = tempfile::tempdir().unwrap();
    let workspace = WorkspaceManager::new(root.path()).acquire().await.unwrap();
    let video = workspace.dir().media_dir().join("Clip.webm");
    std::fs::write(&video, b"webm-bytes").unwrap();

    let store = Arc::new(MemoryStore::new());
    let artifact = ArtifactLocator::new("webm")
        .locate(workspace.dir())
        .await
        .unwrap();
    let reference = StorageUploader::new(store.clone())
        .with_key_prefix("clips")
        .upload(&artifact)
        .await
        .unwrap();

    let object = store.object(&reference.key).unwrap();
    assert_eq!(object.bytes, b"webm-bytes");
    assert_eq!(object.content_type, "video/webm");
    assert!(reference.key.starts_with("clips/"));

    workspace.release().await.unwrap();
}
