//! Call-counting object store decorator
//!
//! Wraps any [`ObjectStore`] and records how many calls of each kind reached
//! it. Used to verify that rejected requests never touch the store.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use vellum_core::{ObjectEntry, ObjectStore, StoreError};

/// Per-operation call counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub read: usize,
    pub link: usize,
    pub create: usize,
}

impl CallCounts {
    /// Sum of all calls
    pub fn total(&self) -> usize {
        self.list + self.read + self.link + self.create
    }
}

/// Decorator counting calls made to the inner store
#[derive(Debug, Default)]
pub struct CountingObjectStore<S> {
    inner: S,
    list: AtomicUsize,
    read: AtomicUsize,
    link: AtomicUsize,
    create: AtomicUsize,
}

impl<S: ObjectStore> CountingObjectStore<S> {
    /// Wrap a store
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            list: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            link: AtomicUsize::new(0),
            create: AtomicUsize::new(0),
        }
    }

    /// Get the wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Snapshot of the counts so far
    pub fn counts(&self) -> CallCounts {
        CallCounts {
            list: self.list.load(Ordering::SeqCst),
            read: self.read.load(Ordering::SeqCst),
            link: self.link.load(Ordering::SeqCst),
            create: self.create.load(Ordering::SeqCst),
        }
    }

    /// Total calls of any kind
    pub fn total_calls(&self) -> usize {
        self.counts().total()
    }

    /// Reset every counter to zero
    pub fn reset(&self) {
        for counter in [&self.list, &self.read, &self.link, &self.create] {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for CountingObjectStore<S> {
    async fn list(&self, folder: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        self.list.fetch_add(1, Ordering::SeqCst);
        self.inner.list(folder).await
    }

    async fn read(&self, folder: &str, name: &str) -> Result<Bytes, StoreError> {
        self.read.fetch_add(1, Ordering::SeqCst);
        self.inner.read(folder, name).await
    }

    async fn link(&self, folder: &str, name: &str) -> Result<String, StoreError> {
        self.link.fetch_add(1, Ordering::SeqCst);
        self.inner.link(folder, name).await
    }

    async fn create(
        &self,
        folder: &str,
        name: &str,
        content: Bytes,
    ) -> Result<ObjectEntry, StoreError> {
        self.create.fetch_add(1, Ordering::SeqCst);
        self.inner.create(folder, name, content).await
    }
}
