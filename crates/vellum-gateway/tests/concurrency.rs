//! Concurrent saves never share or overwrite a version

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use vellum_core::{ObjectStore, SystemClock, max_version};
use vellum_gateway::{
    AllowlistCache, ArtifactGatewayService, ErrorKind, GatewayResult, SaveReceipt,
};
use vellum_storage::{FsObjectStore, StaticAllowlistSource};

use common::*;

const WRITERS: usize = 24;

fn payload(writer: usize) -> String {
    format!("night,sleep_onset,wake\n1,22:{writer:02},06:30\n")
}

/// Spawn one save per writer; results come back tagged with the writer index
async fn save_all(h: &Harness) -> Vec<(usize, GatewayResult<SaveReceipt>)> {
    let tasks = (0..WRITERS).map(|i| {
        let gateway = Arc::clone(&h.gateway);
        tokio::spawn(async move {
            let result = gateway
                .save_edit(CATEGORY, PARTICIPANT, OPERATOR, payload(i).into_bytes())
                .await;
            (i, result)
        })
    });
    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_saves_get_distinct_contiguous_versions() {
    let config = fast_config().with_conflict_retries(64, Duration::from_millis(1));
    let h = Harness::racing(config, WRITERS).await;

    let receipts: Vec<(usize, SaveReceipt)> = save_all(&h)
        .await
        .into_iter()
        .map(|(i, result)| (i, result.unwrap()))
        .collect();

    let versions: HashSet<u32> = receipts.iter().map(|(_, r)| r.artifact.version).collect();
    assert_eq!(versions, (1..=WRITERS as u32).collect());
    // Every writer first went for v1; all but one had to come back
    assert!(h.store.counts().create > WRITERS);

    for (writer, receipt) in &receipts {
        let stored = h.backing().read(FOLDER, &receipt.artifact.name).await.unwrap();
        assert_eq!(stored, payload(*writer).into_bytes());
    }

    let original = h.backing().read(FOLDER, EDITABLE).await.unwrap();
    assert_eq!(&original[..], ORIGINAL_CSV);
    assert_eq!(h.folder_names().await.len(), 3 + WRITERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exhausted_retry_budget_fails_with_version_conflict() {
    // A single attempt each, and every writer targets v1
    let config = fast_config().with_conflict_retries(0, Duration::from_millis(1));
    let h = Harness::racing(config, WRITERS).await;

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for (writer, result) in save_all(&h).await {
        match result {
            Ok(receipt) => winners.push((writer, receipt)),
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::VersionConflict);
                conflicts += 1;
            }
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, WRITERS - 1);
    assert_eq!(h.store.counts().create, WRITERS);

    let (writer, receipt) = &winners[0];
    assert_eq!(receipt.artifact.version, 1);
    let stored = h.backing().read(FOLDER, &receipt.artifact.name).await.unwrap();
    assert_eq!(stored, payload(*writer).into_bytes());

    let names = h.folder_names().await;
    assert_eq!(max_version(EDITABLE, names.iter().map(String::as_str)), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_on_filesystem_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsObjectStore::new(dir.path()).await.unwrap());
    store.create_folder(FOLDER).await.unwrap();
    store.create(FOLDER, EDITABLE, ORIGINAL_CSV.into()).await.unwrap();
    store.create(FOLDER, DOC_SLEEP, (&b"%PDF"[..]).into()).await.unwrap();
    store.create(FOLDER, DOC_DATA, (&b"%PDF"[..]).into()).await.unwrap();

    let config = fast_config().with_conflict_retries(64, Duration::from_millis(1));
    let clock = Arc::new(SystemClock);
    let cache = Arc::new(AllowlistCache::new(
        Arc::new(StaticAllowlistSource::new([OPERATOR])),
        clock.clone(),
        config.allowlist.clone(),
    ));
    cache.refresh_now().await.unwrap();
    let gateway = Arc::new(ArtifactGatewayService::new(&config, store.clone(), cache, clock).unwrap());

    let receipts = join_all((0..12).map(|i| {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            gateway
                .save_edit(CATEGORY, PARTICIPANT, OPERATOR, format!("fs edit {i}\n").into_bytes())
                .await
        })
    }))
    .await;

    let mut versions: Vec<u32> = receipts
        .into_iter()
        .map(|r| r.unwrap().unwrap().artifact.version)
        .collect();
    versions.sort_unstable();
    assert_eq!(versions, (1..=12).collect::<Vec<_>>());

    let original = store.read(FOLDER, EDITABLE).await.unwrap();
    assert_eq!(&original[..], ORIGINAL_CSV);

    let bundle = gateway.search(CATEGORY, PARTICIPANT, OPERATOR).await.unwrap();
    assert_eq!(bundle.latest_version(), 12);
    assert!(bundle.documents[0].link.starts_with("file://"));
}
