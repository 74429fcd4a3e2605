//! Shared fixtures for gateway integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Barrier;

use vellum_core::{ManualClock, ObjectEntry, ObjectStore, StoreError};
use vellum_gateway::{AllowlistCache, ArtifactGatewayService, GatewayConfig};
use vellum_storage::{CountingObjectStore, InMemoryObjectStore, StaticAllowlistSource};

pub const OPERATOR: &str = "Operator@Lab.org";
pub const CATEGORY: &str = "ActiGraph";
pub const PARTICIPANT: &str = "PID001";
pub const FOLDER: &str = "ActiGraph/PID001/output_PID001/results/";
pub const EDITABLE: &str = "part4_nightsummary_sleep_cleaned.csv";
pub const DOC_SLEEP: &str = "visualisation_sleep.pdf";
pub const DOC_DATA: &str = "visualisation_data.pdf";
pub const ORIGINAL_CSV: &[u8] = b"night,sleep_onset,wake\n1,22:10,06:30\n2,23:00,07:15\n";

/// Config with short pauses so failure paths run quickly
pub fn fast_config() -> GatewayConfig {
    GatewayConfig::default()
        .with_read_retries(2, Duration::from_millis(1))
        .with_conflict_retries(8, Duration::from_millis(2))
        .with_call_timeout(Duration::from_secs(2))
        .with_request_deadline(Duration::from_secs(10))
}

/// Put the three well-known artifacts into `folder`
pub fn seed_participant(store: &InMemoryObjectStore, folder: &str) {
    store.seed(folder, EDITABLE, ORIGINAL_CSV);
    store.seed(folder, DOC_SLEEP, &b"%PDF-1.7 sleep"[..]);
    store.seed(folder, DOC_DATA, &b"%PDF-1.7 data"[..]);
}

/// Holds the first `writers` creates until all of them have arrived
///
/// Every held writer has already listed the folder and picked its candidate
/// by then, so they all target the same version and really collide.
pub struct RendezvousStore<S> {
    inner: S,
    gate: Option<Barrier>,
    held: AtomicUsize,
}

impl<S> RendezvousStore<S> {
    pub fn passthrough(inner: S) -> Self {
        Self {
            inner,
            gate: None,
            held: AtomicUsize::new(0),
        }
    }

    pub fn new(inner: S, writers: usize) -> Self {
        Self {
            inner,
            gate: Some(Barrier::new(writers)),
            held: AtomicUsize::new(writers),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for RendezvousStore<S> {
    async fn list(&self, folder: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        self.inner.list(folder).await
    }

    async fn read(&self, folder: &str, name: &str) -> Result<Bytes, StoreError> {
        self.inner.read(folder, name).await
    }

    async fn link(&self, folder: &str, name: &str) -> Result<String, StoreError> {
        self.inner.link(folder, name).await
    }

    async fn create(&self, folder: &str, name: &str, content: Bytes) -> Result<ObjectEntry, StoreError> {
        if let Some(gate) = &self.gate {
            let hold = self
                .held
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if hold {
                gate.wait().await;
            }
        }
        self.inner.create(folder, name, content).await
    }
}

/// A gateway over an in-memory store, with every collaborator exposed
pub struct Harness {
    pub store: Arc<CountingObjectStore<RendezvousStore<InMemoryObjectStore>>>,
    pub source: Arc<StaticAllowlistSource>,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<AllowlistCache>,
    pub gateway: Arc<ArtifactGatewayService>,
}

impl Harness {
    /// Seeded store, allowlist holding [`OPERATOR`], cache refreshed once
    pub async fn new() -> Self {
        Self::with_config(fast_config()).await
    }

    pub async fn with_config(config: GatewayConfig) -> Self {
        Self::build(config, RendezvousStore::passthrough(InMemoryObjectStore::new())).await
    }

    /// The first `writers` creates wait for each other before landing
    pub async fn racing(config: GatewayConfig, writers: usize) -> Self {
        Self::build(config, RendezvousStore::new(InMemoryObjectStore::new(), writers)).await
    }

    async fn build(config: GatewayConfig, backing: RendezvousStore<InMemoryObjectStore>) -> Self {
        let store = Arc::new(CountingObjectStore::new(backing));
        seed_participant(store.inner().inner(), FOLDER);

        let source = Arc::new(StaticAllowlistSource::new([OPERATOR]));
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(AllowlistCache::new(
            source.clone(),
            clock.clone(),
            config.allowlist.clone(),
        ));
        cache.refresh_now().await.unwrap();

        let gateway = Arc::new(
            ArtifactGatewayService::new(&config, store.clone(), cache.clone(), clock.clone())
                .unwrap(),
        );
        store.reset();

        Self {
            store,
            source,
            clock,
            cache,
            gateway,
        }
    }

    /// The uncounted in-memory store underneath
    pub fn backing(&self) -> &InMemoryObjectStore {
        self.store.inner().inner()
    }

    /// Names currently in the participant folder
    pub async fn folder_names(&self) -> Vec<String> {
        self.backing()
            .list(FOLDER)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect()
    }
}
