//! The gateway surface: `search` and `save_edit`
//!
//! Both operations authorize first, then resolve the path, and only then
//! touch the store. Every store call runs under a per-call timeout and read
//! calls are retried on transient failure. The whole request runs under an
//! overall deadline. Dropping the returned future cancels everything in
//! flight.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Span, debug, info, instrument, warn};
use uuid::Uuid;

use vellum_core::{
    ArtifactFolder, Clock, ObjectEntry, ObjectStore, Principal, StoreError, VersionedArtifact,
    parse_version,
};
use vellum_logging::{AUDIT_TARGET, CorrelationExt, Operation, RequestCorrelation};

use crate::allowlist::{AllowlistCache, SnapshotStamp};
use crate::config::{ConfigError, GatewayConfig};
use crate::error::{GatewayError, GatewayResult};
use crate::gate::{AccessDecision, AuthorizationGate};
use crate::resolver::PathResolver;
use crate::retry::{RetryPolicy, retry_transient, with_timeout};
use crate::table::TableShape;
use crate::versioning::VersionedWriteCoordinator;

/// The editable table as found in the folder
#[derive(Debug, Clone, Serialize)]
pub struct EditableTable {
    pub name: String,
    #[serde(skip)]
    pub content: Bytes,
    pub size: u64,
    pub shape: TableShape,
}

/// A read-only document, exposed only as a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLink {
    pub name: String,
    pub link: String,
}

/// Everything `search` returns for one participant
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactsBundle {
    pub folder: ArtifactFolder,
    pub table: EditableTable,
    pub documents: [DocumentLink; 2],
    /// Existing gateway-created versions of the table, ascending
    pub versions: Vec<u32>,
    /// Allowlist snapshot the request was authorized against
    pub authorized_by: SnapshotStamp,
}

impl ArtifactsBundle {
    /// Highest existing version, 0 when only the original exists
    pub fn latest_version(&self) -> u32 {
        self.versions.last().copied().unwrap_or(0)
    }
}

/// Record of one successful save
#[derive(Debug, Clone, Serialize)]
pub struct SaveReceipt {
    pub artifact: VersionedArtifact,
    pub principal: Principal,
    pub category: String,
    pub participant_id: String,
    pub saved_at: DateTime<Utc>,
    /// Link to the new version; `None` if it could not be obtained after the write
    pub link: Option<String>,
    pub request_id: Uuid,
}

/// Entry point for operators
pub struct ArtifactGatewayService {
    resolver: PathResolver,
    gate: AuthorizationGate,
    store: Arc<dyn ObjectStore>,
    coordinator: VersionedWriteCoordinator,
    clock: Arc<dyn Clock>,
    read_retry: RetryPolicy,
    call_timeout: Duration,
    request_deadline: Duration,
}

impl ArtifactGatewayService {
    /// Wire a service from validated configuration and its collaborators
    pub fn new(
        config: &GatewayConfig,
        store: Arc<dyn ObjectStore>,
        allowlist: Arc<AllowlistCache>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            resolver: PathResolver::from_config(config)?,
            gate: AuthorizationGate::new(allowlist),
            coordinator: VersionedWriteCoordinator::new(Arc::clone(&store), &config.store),
            store,
            clock,
            read_retry: config.store.read_retry_policy(),
            call_timeout: config.store.call_timeout(),
            request_deadline: config.request_deadline(),
        })
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    pub fn allowlist(&self) -> &Arc<AllowlistCache> {
        self.gate.cache()
    }

    /// Locate the artifacts for a participant
    #[instrument(
        name = "search",
        skip(self, principal),
        fields(request_id = tracing::field::Empty, operation = tracing::field::Empty)
    )]
    pub async fn search(
        &self,
        category: &str,
        participant_id: &str,
        principal: &str,
    ) -> GatewayResult<ArtifactsBundle> {
        let correlation = RequestCorrelation::new(Operation::Search, self.clock.now_utc());
        Span::current().record_correlation(&correlation);

        let result = self
            .within_deadline(self.search_inner(category, participant_id, principal))
            .await;
        if let Err(e) = &result {
            debug!(kind = %e.kind(), error = %e, "Search failed");
        }
        result
    }

    async fn search_inner(
        &self,
        category: &str,
        participant_id: &str,
        principal: &str,
    ) -> GatewayResult<ArtifactsBundle> {
        let decision = self.gate.authorize(principal);
        decision.ensure_allowed()?;
        let folder = self.resolver.resolve(category, participant_id)?;

        let entries = self.list_folder(&folder).await?;
        ensure_present(&folder, &entries)?;

        let editable = folder.editable_name();
        let mut versions: Vec<u32> = entries
            .iter()
            .filter_map(|e| parse_version(editable, &e.name))
            .filter(|v| *v > 0)
            .collect();
        versions.sort_unstable();

        let [doc_a, doc_b] = folder.document_names();
        let (content, link_a, link_b) = tokio::try_join!(
            self.read(&folder, editable),
            self.link(&folder, doc_a),
            self.link(&folder, doc_b),
        )?;

        let shape = TableShape::measure(&content);
        info!(
            principal = %decision.principal,
            folder = folder.path(),
            rows = shape.rows,
            columns = shape.columns,
            versions = versions.len(),
            "Search resolved artifacts"
        );

        Ok(ArtifactsBundle {
            table: EditableTable {
                name: editable.to_string(),
                size: content.len() as u64,
                content,
                shape,
            },
            documents: [
                DocumentLink {
                    name: doc_a.to_string(),
                    link: link_a,
                },
                DocumentLink {
                    name: doc_b.to_string(),
                    link: link_b,
                },
            ],
            versions,
            authorized_by: decision.snapshot,
            folder,
        })
    }

    /// Persist an edited table as a new version
    #[instrument(
        name = "save_edit",
        skip(self, principal, content),
        fields(request_id = tracing::field::Empty, operation = tracing::field::Empty)
    )]
    pub async fn save_edit(
        &self,
        category: &str,
        participant_id: &str,
        principal: &str,
        content: impl Into<Bytes>,
    ) -> GatewayResult<SaveReceipt> {
        let correlation = RequestCorrelation::new(Operation::SaveEdit, self.clock.now_utc());
        Span::current().record_correlation(&correlation);

        let content = content.into();
        let result = self
            .within_deadline(self.save_inner(
                category,
                participant_id,
                principal,
                content,
                &correlation,
            ))
            .await;
        if let Err(e) = &result {
            debug!(kind = %e.kind(), error = %e, "Save failed");
        }
        result
    }

    async fn save_inner(
        &self,
        category: &str,
        participant_id: &str,
        principal: &str,
        content: Bytes,
        correlation: &RequestCorrelation,
    ) -> GatewayResult<SaveReceipt> {
        let decision = self.gate.authorize(principal);
        decision.ensure_allowed()?;
        let folder = self.resolver.resolve(category, participant_id)?;

        let entries = self.list_folder(&folder).await?;
        let editable = folder.editable_name();
        if !entries.iter().any(|e| e.name == editable) {
            return Err(GatewayError::artifact_not_found(folder.path(), editable));
        }

        let artifact = self
            .coordinator
            .commit_new_version(folder.path(), editable, content)
            .await?;

        let link = match self.link(&folder, &artifact.name).await {
            Ok(link) => Some(link),
            Err(e) => {
                warn!(name = %artifact.name, error = %e, "Saved, but could not obtain a link");
                None
            }
        };

        let saved_at = self.clock.now_utc();
        let receipt = SaveReceipt {
            saved_at,
            principal: decision.principal,
            category: category.to_string(),
            participant_id: participant_id.to_string(),
            link,
            request_id: correlation.request_id,
            artifact,
        };
        audit_save(&receipt, decision.snapshot, correlation.elapsed_ms(saved_at));
        Ok(receipt)
    }

    /// Check a principal without touching the store
    pub fn check_access(&self, principal: &str) -> AccessDecision {
        self.gate.authorize(principal)
    }

    async fn within_deadline<T>(
        &self,
        fut: impl Future<Output = GatewayResult<T>>,
    ) -> GatewayResult<T> {
        match tokio::time::timeout(self.request_deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline_ms = self.request_deadline.as_millis() as u64, "Request deadline exceeded");
                Err(GatewayError::remote("request deadline exceeded"))
            }
        }
    }

    async fn list_folder(&self, folder: &ArtifactFolder) -> GatewayResult<Vec<ObjectEntry>> {
        let path = folder.path();
        retry_transient(self.read_retry, "list", || {
            with_timeout(self.call_timeout, self.store.list(path))
        })
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => GatewayError::folder_not_found(path),
            other => GatewayError::from_store("list", other),
        })
    }

    async fn read(&self, folder: &ArtifactFolder, name: &str) -> GatewayResult<Bytes> {
        let path = folder.path();
        retry_transient(self.read_retry, "read", || {
            with_timeout(self.call_timeout, self.store.read(path, name))
        })
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => GatewayError::artifact_not_found(path, name),
            other => GatewayError::from_store("read", other),
        })
    }

    async fn link(&self, folder: &ArtifactFolder, name: &str) -> GatewayResult<String> {
        let path = folder.path();
        retry_transient(self.read_retry, "link", || {
            with_timeout(self.call_timeout, self.store.link(path, name))
        })
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => GatewayError::artifact_not_found(path, name),
            other => GatewayError::from_store("link", other),
        })
    }
}

/// Fail on the first well-known artifact missing from the listing
fn ensure_present(folder: &ArtifactFolder, entries: &[ObjectEntry]) -> GatewayResult<()> {
    for name in folder.names().all() {
        if !entries.iter().any(|e| e.name == name) {
            return Err(GatewayError::artifact_not_found(folder.path(), name));
        }
    }
    Ok(())
}

fn audit_save(receipt: &SaveReceipt, snapshot: SnapshotStamp, latency_ms: u64) {
    info!(
        target: AUDIT_TARGET,
        principal = %receipt.principal,
        category = %receipt.category,
        participant = %receipt.participant_id,
        version = receipt.artifact.version,
        name = %receipt.artifact.name,
        size = receipt.artifact.size,
        saved_at = %receipt.saved_at.to_rfc3339(),
        allowlist_generation = snapshot.generation,
        latency_ms,
        "Saved new version"
    );
}
