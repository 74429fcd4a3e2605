//! # Vellum Gateway
//!
//! Versioned artifact gateway: lets an authorized operator find the results
//! of one `(category, participant)` pair in a hierarchical store and save
//! edits to the editable table as new, numbered versions. Nothing that
//! exists is ever modified or deleted.
//!
//! ## Components
//!
//! - [`PathResolver`]: validates identifiers and builds the results folder path
//! - [`AllowlistCache`]: periodically refreshed, atomically replaced allowlist snapshot
//! - [`AuthorizationGate`]: fail-closed membership check against the snapshot
//! - [`VersionedWriteCoordinator`]: race-safe `max + 1` create-if-absent loop
//! - [`ArtifactGatewayService`]: `search` and `save_edit`
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vellum_core::SystemClock;
//! use vellum_gateway::{AllowlistCache, ArtifactGatewayService, GatewayConfig};
//! use vellum_storage::{FileAllowlistSource, FsObjectStore};
//!
//! let config = GatewayConfig::from_file("vellum.toml".as_ref())?;
//! let clock = Arc::new(SystemClock);
//! let cache = Arc::new(AllowlistCache::new(
//!     Arc::new(FileAllowlistSource::new("allowlist.csv")),
//!     clock.clone(),
//!     config.allowlist.clone(),
//! ));
//! cache.bootstrap().await;
//! let _refresh = cache.spawn_refresh();
//!
//! let store = Arc::new(FsObjectStore::new("/srv/results").await?);
//! let gateway = ArtifactGatewayService::new(&config, store, cache, clock)?;
//!
//! let bundle = gateway.search("ActiGraph", "PID001", "operator@lab.org").await?;
//! let receipt = gateway
//!     .save_edit("ActiGraph", "PID001", "operator@lab.org", edited_csv)
//!     .await?;
//! assert_eq!(receipt.artifact.version, bundle.latest_version() + 1);
//! ```

pub mod allowlist;
pub mod config;
pub mod error;
pub mod gate;
pub mod resolver;
pub mod retry;
pub mod service;
pub mod table;
pub mod versioning;

// Re-exports
pub use allowlist::{AllowlistCache, AllowlistSnapshot, Freshness, RefreshHandle, SnapshotStamp};
pub use config::{AllowlistConfig, ConfigError, GatewayConfig, StoreConfig};
pub use error::{
    ErrorKind, Field, GatewayError, GatewayResult, NotFoundTarget, PathValidationError,
    ValidationReason,
};
pub use gate::{AccessDecision, AuthorizationGate, DenyReason, Verdict};
pub use resolver::{CategorySet, MAX_IDENTIFIER_LEN, PathResolver, validate_identifier};
pub use retry::RetryPolicy;
pub use service::{ArtifactGatewayService, ArtifactsBundle, DocumentLink, EditableTable, SaveReceipt};
pub use table::TableShape;
pub use versioning::VersionedWriteCoordinator;
