//! Fault-injecting object store decorator
//!
//! Lets tests exercise retry, timeout, and interleaving behavior against an
//! otherwise well-behaved store.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

use vellum_core::{ObjectEntry, ObjectStore, StoreError};

/// Decorator that fails or delays calls on demand
///
/// Injected failures are [`StoreError::Unavailable`], i.e. transient.
#[derive(Debug)]
pub struct FaultyObjectStore<S> {
    inner: S,
    fail_lists: AtomicU32,
    fail_reads: AtomicU32,
    fail_creates: AtomicU32,
    delay_ms: AtomicU64,
}

impl<S: ObjectStore> FaultyObjectStore<S> {
    /// Wrap a store with no faults armed
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_lists: AtomicU32::new(0),
            fail_reads: AtomicU32::new(0),
            fail_creates: AtomicU32::new(0),
            delay_ms: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail the next `n` list calls
    pub fn fail_next_lists(&self, n: u32) {
        self.fail_lists.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` read and link calls
    pub fn fail_next_reads(&self, n: u32) {
        self.fail_reads.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` create calls
    pub fn fail_next_creates(&self, n: u32) {
        self.fail_creates.store(n, Ordering::SeqCst);
    }

    /// Delay every call by `delay`
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn before_call(&self, counter: &AtomicU32, op: &str) -> Result<(), StoreError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let armed = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            trace!(op, "Injecting store failure");
            return Err(StoreError::unavailable(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for FaultyObjectStore<S> {
    async fn list(&self, folder: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        self.before_call(&self.fail_lists, "list").await?;
        self.inner.list(folder).await
    }

    async fn read(&self, folder: &str, name: &str) -> Result<Bytes, StoreError> {
        self.before_call(&self.fail_reads, "read").await?;
        self.inner.read(folder, name).await
    }

    async fn link(&self, folder: &str, name: &str) -> Result<String, StoreError> {
        self.before_call(&self.fail_reads, "link").await?;
        self.inner.link(folder, name).await
    }

    async fn create(
        &self,
        folder: &str,
        name: &str,
        content: Bytes,
    ) -> Result<ObjectEntry, StoreError> {
        self.before_call(&self.fail_creates, "create").await?;
        self.inner.create(folder, name, content).await
    }
}
