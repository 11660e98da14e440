use std::fs;
use std::sync::Arc;
use std::time::Duration;

use relocator_coordinator::{CleanupOutcome, Coordinator, TransferProgress, TransferStateKind};
use relocator_core::PreferenceStore;
use relocator_engine::{
    CachedPreferenceStore, EventChannel, FilePreferenceStore, FsTransferEngine, TransferOptions,
};

#[tokio::test]
async fn test_relocate_and_clean_up_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let old_root = dir.path().join("old");
    let new_root = dir.path().join("new");
    fs::create_dir_all(old_root.join("media")).unwrap();
    fs::write(old_root.join("library.db"), "rows").unwrap();
    fs::write(old_root.join("media/cover.png"), [0u8; 64]).unwrap();

    let store = Arc::new(CachedPreferenceStore::new(FilePreferenceStore::new(
        dir.path().join("settings.toml"),
        "root_directory",
        &old_root,
    )));
    let events = EventChannel::new("relocation", 32);
    let engine = Arc::new(FsTransferEngine::new(
        store.clone(),
        events.clone(),
        TransferOptions::default(),
    ));
    let coordinator = Coordinator::new(store.clone(), store.clone(), engine);
    let subscription = coordinator.listen(events.subscribe());
    let mut watch = coordinator.watch();

    // Warm the cache so invalidation is observable.
    assert_eq!(store.get().unwrap(), old_root);

    coordinator.start(&new_root).unwrap();
    let kind = coordinator.confirm(true).await.unwrap();
    assert_eq!(kind, TransferStateKind::Success);

    tokio::time::timeout(
        Duration::from_secs(5),
        watch.wait_for(|r| r.progress == TransferProgress::new(2, 2)),
    )
    .await
    .unwrap()
    .unwrap();

    let record = coordinator.snapshot();
    assert_eq!(record.pending_delete_directory(), Some(old_root.as_path()));
    assert_eq!(record.previous_directory.as_deref(), Some(new_root.as_path()));
    assert_eq!(store.inner().get().unwrap(), new_root);
    assert_eq!(store.get().unwrap(), new_root);
    assert_eq!(fs::read_to_string(new_root.join("library.db")).unwrap(), "rows");

    assert_eq!(coordinator.clear_old_dir().await, CleanupOutcome::Deleted);
    assert_eq!(coordinator.state(), TransferStateKind::Delete);
    assert!(!old_root.exists());
    assert!(new_root.join("media/cover.png").exists());

    subscription.shutdown().await;
}

#[tokio::test]
async fn test_invalid_destination_surfaces_as_error_state() {
    let dir = tempfile::tempdir().unwrap();
    let old_root = dir.path().join("old");
    fs::create_dir_all(&old_root).unwrap();

    let store = Arc::new(FilePreferenceStore::new(
        dir.path().join("settings.toml"),
        "root_directory",
        &old_root,
    ));
    let events = EventChannel::new("relocation", 8);
    let engine = Arc::new(FsTransferEngine::new(
        store.clone(),
        events,
        TransferOptions::default(),
    ));
    let invalidator = Arc::new(CachedPreferenceStore::new(FilePreferenceStore::new(
        dir.path().join("settings.toml"),
        "root_directory",
        &old_root,
    )));
    let coordinator = Coordinator::new(store, invalidator, engine);

    coordinator.start(old_root.join("nested")).unwrap();
    assert_eq!(coordinator.confirm(true).await, Ok(TransferStateKind::Error));

    let record = coordinator.snapshot();
    assert!(record.last_error().unwrap().contains("inside the current root"));
    assert_eq!(record.target_directory(), Some(old_root.join("nested").as_path()));
}
