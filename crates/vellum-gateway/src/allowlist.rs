//! Allowlist cache with periodic refresh
//!
//! The cache holds the last successfully fetched allowlist as an immutable
//! [`AllowlistSnapshot`] behind an `ArcSwap`. A refresh builds a complete new
//! snapshot and swaps it in one step, so readers see either the old set or
//! the new set, never a mix, and never wait on a lock. Each publication is
//! announced on a `watch` channel carrying the new generation.
//!
//! Failed refreshes keep the previous snapshot. Once it is older than the
//! staleness threshold, [`AllowlistCache::current_snapshot`] flags it
//! [`Freshness::Unusable`] and the gate denies everyone until a refresh
//! succeeds. A cache that has never fetched successfully is unusable too.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use vellum_core::{AllowlistError, AllowlistSource, Clock, Principal};

use crate::config::AllowlistConfig;

/// Whether a snapshot may be used for decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    Unusable,
}

/// Identifies the snapshot a decision was made against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStamp {
    /// 0 for the cold-start placeholder, then +1 per successful refresh
    pub generation: u64,
    /// Wall-clock capture time, if any fetch ever succeeded
    pub captured_at: Option<DateTime<Utc>>,
    pub freshness: Freshness,
}

/// An immutable allowlist capture
///
/// Cloning is cheap: the member set is shared.
#[derive(Debug, Clone)]
pub struct AllowlistSnapshot {
    members: Arc<HashSet<String>>,
    generation: u64,
    captured_at: Option<DateTime<Utc>>,
    captured_instant: Option<Instant>,
    freshness: Freshness,
}

impl AllowlistSnapshot {
    /// The placeholder published before the first successful fetch
    fn cold() -> Self {
        Self {
            members: Arc::new(HashSet::new()),
            generation: 0,
            captured_at: None,
            captured_instant: None,
            freshness: Freshness::Unusable,
        }
    }

    /// Membership test against the normalized set
    pub fn contains(&self, principal: &Principal) -> bool {
        self.members.contains(principal.as_str())
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    pub fn is_usable(&self) -> bool {
        self.freshness == Freshness::Fresh
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True until the first successful fetch
    pub fn is_cold(&self) -> bool {
        self.captured_instant.is_none()
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }

    /// Age at `now`, if ever captured
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.captured_instant
            .map(|captured| now.saturating_duration_since(captured))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn stamp(&self) -> SnapshotStamp {
        SnapshotStamp {
            generation: self.generation,
            captured_at: self.captured_at,
            freshness: self.freshness,
        }
    }
}

/// Cached, periodically refreshed view of the allowlist source
pub struct AllowlistCache {
    source: Arc<dyn AllowlistSource>,
    clock: Arc<dyn Clock>,
    config: AllowlistConfig,
    /// Latest published snapshot
    published: ArcSwap<AllowlistSnapshot>,
    /// Generation of each publication
    announce: watch::Sender<u64>,
    /// Serializes refreshes so an older fetch never replaces a newer one
    refresh_lock: Mutex<()>,
    consecutive_failures: AtomicU32,
}

impl AllowlistCache {
    /// Create a cold cache; nothing is fetched until a refresh runs
    pub fn new(
        source: Arc<dyn AllowlistSource>,
        clock: Arc<dyn Clock>,
        config: AllowlistConfig,
    ) -> Self {
        let (announce, _) = watch::channel(0);
        Self {
            source,
            clock,
            config,
            published: ArcSwap::from_pointee(AllowlistSnapshot::cold()),
            announce,
            refresh_lock: Mutex::new(()),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Initial fetch; a failure is logged and leaves the cache unusable
    pub async fn bootstrap(&self) -> AllowlistSnapshot {
        if let Err(e) = self.refresh_now().await {
            warn!(error = %e, "Initial allowlist fetch failed, denying all access until a refresh succeeds");
        }
        self.current_snapshot()
    }

    /// Fetch the full list and publish it as a new snapshot
    ///
    /// Returns the new generation number.
    #[instrument(name = "allowlist_refresh", skip(self))]
    pub async fn refresh_now(&self) -> Result<u64, AllowlistError> {
        let _serialized = self.refresh_lock.lock().await;

        let timeout = self.config.fetch_timeout();
        let fetched = match tokio::time::timeout(timeout, self.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(AllowlistError::Timeout(timeout)),
        };

        let entries = match fetched {
            Ok(entries) => entries,
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                let snapshot = self.current_snapshot();
                warn!(
                    error = %e,
                    consecutive_failures = failures,
                    generation = snapshot.generation(),
                    freshness = ?snapshot.freshness(),
                    "Allowlist refresh failed, keeping previous snapshot"
                );
                return Err(e);
            }
        };

        let members: HashSet<String> = entries
            .iter()
            .map(|entry| Principal::normalize(entry))
            .filter(|principal| !principal.is_empty())
            .map(|principal| principal.as_str().to_string())
            .collect();

        let generation = self.published.load().generation + 1;
        let snapshot = AllowlistSnapshot {
            members: Arc::new(members),
            generation,
            captured_at: Some(self.clock.now_utc()),
            captured_instant: Some(self.clock.now()),
            freshness: Freshness::Fresh,
        };
        let count = snapshot.len();
        self.published.store(Arc::new(snapshot));
        self.announce.send_replace(generation);
        self.consecutive_failures.store(0, Ordering::SeqCst);

        info!(generation, members = count, "Published allowlist snapshot");
        Ok(generation)
    }

    /// The latest snapshot, flagged unusable if cold or stale
    pub fn current_snapshot(&self) -> AllowlistSnapshot {
        let mut snapshot = AllowlistSnapshot::clone(&self.published.load());
        snapshot.freshness = match snapshot.age(self.clock.now()) {
            Some(age) if age <= self.config.staleness_threshold() => Freshness::Fresh,
            _ => Freshness::Unusable,
        };
        snapshot
    }

    /// Watch the generation of each publication
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.announce.subscribe()
    }

    /// Failed refreshes since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &AllowlistConfig {
        &self.config
    }

    /// Start the periodic refresh loop
    ///
    /// The first tick fires one interval from now; call
    /// [`bootstrap`](Self::bootstrap) first for an immediate fetch.
    pub fn spawn_refresh(self: &Arc<Self>) -> RefreshHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = RefreshTask {
            cache: Arc::clone(self),
            interval: self.config.refresh_interval(),
            shutdown_rx,
        };

        RefreshHandle {
            shutdown_tx,
            task: Some(tokio::spawn(task.run())),
        }
    }
}

/// Background task refreshing the cache on an interval
struct RefreshTask {
    cache: Arc<AllowlistCache>,
    interval: Duration,
    shutdown_rx: broadcast::Receiver<()>,
}

impl RefreshTask {
    async fn run(mut self) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Allowlist refresh task started"
        );

        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Allowlist refresh task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    // Failures are logged inside refresh_now and absorbed here
                    if self.cache.refresh_now().await.is_err() {
                        debug!(
                            consecutive_failures = self.cache.consecutive_failures(),
                            "Refresh tick failed"
                        );
                    }
                }
            }
        }
    }
}

/// Handle to a running refresh loop
///
/// Dropping the handle signals the loop to stop; [`stop`](Self::stop) also
/// waits for it to finish.
pub struct RefreshHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Signal shutdown and wait for the loop to exit
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}
