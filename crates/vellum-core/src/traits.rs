//! Collaborator traits for the Vellum gateway
//!
//! These traits are the seams between the gateway and the outside world.
//!
//! ## Key Traits
//!
//! - [`ObjectStore`]: the hierarchical store holding participant results
//! - [`AllowlistSource`]: the externally maintained list of permitted principals
//! - [`Clock`]: time abstraction for testability

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::artifact::ObjectEntry;
use crate::error::{AllowlistError, StoreError};

/// Storage abstraction over a hierarchical object store
///
/// Folders are `/`-separated paths ending in `/`. Implementations must never
/// overwrite: [`create`](ObjectStore::create) fails with
/// [`StoreError::AlreadyExists`] when the name is taken, and there is no
/// update or delete operation at all.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List all entries directly inside `folder`
    ///
    /// Fails with [`StoreError::NotFound`] if the folder does not exist.
    async fn list(&self, folder: &str) -> Result<Vec<ObjectEntry>, StoreError>;

    /// Read the full content of a named entry
    async fn read(&self, folder: &str, name: &str) -> Result<Bytes, StoreError>;

    /// Get a dereferenceable link for a named entry
    async fn link(&self, folder: &str, name: &str) -> Result<String, StoreError>;

    /// Create a new entry, failing if the name already exists
    ///
    /// The folder must already exist.
    async fn create(&self, folder: &str, name: &str, content: Bytes)
    -> Result<ObjectEntry, StoreError>;
}

/// Source of the full current allowlist
#[async_trait]
pub trait AllowlistSource: Send + Sync {
    /// Fetch every identifier currently on the list, un-normalized
    async fn fetch(&self) -> Result<Vec<String>, AllowlistError>;
}

/// Time abstraction for testability
///
/// This trait allows tests to control time, enabling deterministic
/// testing of staleness behavior.
pub trait Clock: Send + Sync {
    /// Get the current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get the current UTC datetime
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real clock implementation using system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
