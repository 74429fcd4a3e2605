//! Append-only version creation
//!
//! The store is the only source of truth for which versions exist. Each
//! attempt lists the folder, picks `max + 1`, and asks the store to create
//! that name if absent. Losing a race to another writer just means listing
//! again; nothing is ever overwritten and no number is handed out twice.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use vellum_core::{ObjectEntry, ObjectStore, StoreError, VersionedArtifact, max_version, versioned_name};

use crate::config::StoreConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::retry::{RetryPolicy, retry_transient, with_timeout};

/// Writes new versions of an artifact without ever overwriting one
pub struct VersionedWriteCoordinator {
    store: Arc<dyn ObjectStore>,
    max_conflict_retries: u32,
    conflict_backoff: Duration,
    read_retry: RetryPolicy,
    call_timeout: Duration,
}

impl VersionedWriteCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            max_conflict_retries: config.conflict_retries,
            conflict_backoff: config.conflict_backoff(),
            read_retry: config.read_retry_policy(),
            call_timeout: config.call_timeout(),
        }
    }

    /// Create the next version of `base_name` in `folder`
    ///
    /// Fails with [`GatewayError::VersionConflict`] once every attempt lost a
    /// race, and with [`GatewayError::RemoteService`] when a create fails for
    /// any other reason. In the latter case the outcome is unknown; the next
    /// call re-lists and will see the version if it was written.
    #[instrument(name = "commit_version", skip(self, content), fields(size = content.len()))]
    pub async fn commit_new_version(
        &self,
        folder: &str,
        base_name: &str,
        content: Bytes,
    ) -> GatewayResult<VersionedArtifact> {
        let attempts = self.max_conflict_retries.saturating_add(1);

        for attempt in 0..attempts {
            let entries = self.list(folder).await?;
            let current = max_version(base_name, entries.iter().map(|e| e.name.as_str()));
            let candidate = current
                .checked_add(1)
                .ok_or_else(|| GatewayError::remote(format!("version numbers exhausted for {base_name}")))?;
            let name = versioned_name(base_name, candidate);

            let created = with_timeout(
                self.call_timeout,
                self.store.create(folder, &name, content.clone()),
            )
            .await;

            match created {
                Ok(entry) => {
                    info!(folder, name = %name, version = candidate, attempt = attempt + 1, "Committed new version");
                    return Ok(VersionedArtifact {
                        folder: folder.to_string(),
                        base_name: base_name.to_string(),
                        name,
                        version: candidate,
                        size: entry.size,
                        created_at: entry.created_at,
                    });
                }
                Err(StoreError::AlreadyExists(_)) => {
                    debug!(version = candidate, attempt = attempt + 1, "Version taken, re-listing");
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.conflict_pause(attempt)).await;
                    }
                }
                Err(StoreError::NotFound(_)) => {
                    return Err(GatewayError::folder_not_found(folder));
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "Create failed, outcome unknown");
                    return Err(GatewayError::from_store("create", e));
                }
            }
        }

        warn!(base_name, attempts, "Gave up after repeated version conflicts");
        Err(GatewayError::VersionConflict {
            base_name: base_name.to_string(),
            attempts,
        })
    }

    async fn list(&self, folder: &str) -> GatewayResult<Vec<ObjectEntry>> {
        retry_transient(self.read_retry, "list", || {
            with_timeout(self.call_timeout, self.store.list(folder))
        })
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => GatewayError::folder_not_found(folder),
            other => GatewayError::from_store("list", other),
        })
    }

    /// Random pause in `0..=backoff * (attempt + 1)` to spread out racing writers
    fn conflict_pause(&self, attempt: u32) -> Duration {
        let ceiling = self.conflict_backoff.saturating_mul(attempt + 1);
        let ceiling_ms = ceiling.as_millis() as u64;
        if ceiling_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=ceiling_ms))
    }
}
