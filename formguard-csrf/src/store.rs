//! In-memory token store
//!
//! Uses DashMap for concurrent access. Expired records are dropped lazily on
//! lookup and proactively by a background sweep task. The store never holds
//! more than `max_store_size` records.

use crate::clock::{Clock, SystemClock};
use crate::config::CsrfConfig;
use crate::token::TokenRecord;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

/// Point-in-time store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of records, live or not yet swept
    pub size: usize,
    /// Rough bytes held by keys and records
    pub approximate_memory: usize,
}

/// Bounded session handle → token record map
pub struct TokenStore {
    entries: DashMap<String, TokenRecord>,
    max_size: usize,
    sweep_interval: Duration,
    clock: Arc<dyn Clock>,
    /// Serializes the capacity check with the insert that follows it
    insert_lock: Mutex<()>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl TokenStore {
    /// Create a store sized from `config`, using the wall clock
    pub fn new(config: &CsrfConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store with an explicit clock
    pub fn with_clock(config: &CsrfConfig, clock: Arc<dyn Clock>) -> Self {
        debug!(
            max_size = config.max_store_size,
            sweep_interval = ?config.sweep_interval,
            "Creating in-memory CSRF token store"
        );
        Self {
            entries: DashMap::new(),
            max_size: config.max_store_size.max(1),
            sweep_interval: config.sweep_interval,
            clock,
            insert_lock: Mutex::new(()),
            sweeper: Mutex::new(None),
        }
    }

    /// Insert or overwrite the record for `session_id`.
    ///
    /// A new key arriving at a full store triggers eviction first.
    pub fn set(&self, session_id: impl Into<String>, record: TokenRecord) {
        let session_id = session_id.into();
        let _guard = self.insert_lock.lock();

        if !self.entries.contains_key(&session_id) && self.entries.len() >= self.max_size {
            self.evict();
        }

        trace!(session = %session_id, "Storing CSRF token record");
        self.entries.insert(session_id, record);
    }

    /// Look up a live record. Expired records are removed and reported absent.
    pub fn get(&self, session_id: &str) -> Option<TokenRecord> {
        let now = self.clock.now();
        let record = self.entries.get(session_id).map(|entry| entry.value().clone())?;

        if record.is_expired_at(now) {
            self.entries
                .remove_if(session_id, |_, current| current.is_expired_at(now));
            trace!(session = %session_id, "Dropped expired CSRF token record");
            return None;
        }

        Some(record)
    }

    /// Atomically remove and return the live record for `session_id`, but
    /// only if it still carries `token_base`.
    ///
    /// Of several concurrent callers consuming the same record, exactly one
    /// gets it back.
    pub fn take(&self, session_id: &str, token_base: &str) -> Option<TokenRecord> {
        let now = self.clock.now();
        self.entries
            .remove_if(session_id, |_, record| {
                record.token_base == token_base && !record.is_expired_at(now)
            })
            .map(|(_, record)| record)
    }

    /// Remove the record for `session_id`
    pub fn delete(&self, session_id: &str) -> bool {
        self.entries.remove(session_id).is_some()
    }

    /// Remove every record
    pub fn clear(&self) {
        debug!(removed = self.entries.len(), "Clearing CSRF token store");
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> StoreStats {
        let approximate_memory = self
            .entries
            .iter()
            .map(|entry| entry.key().capacity() + entry.value().approximate_size())
            .sum();

        StoreStats {
            size: self.entries.len(),
            approximate_memory,
        }
    }

    /// Remove every expired record, returning how many were removed.
    ///
    /// Keys are collected first under DashMap's per-shard read locks, then
    /// removed one at a time. Writers to a shard wait for that shard's scan,
    /// never for the whole sweep.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.clock.now())
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        expired
            .iter()
            .filter(|key| {
                self.entries
                    .remove_if(key.as_str(), |_, record| record.is_expired_at(now))
                    .is_some()
            })
            .count()
    }

    /// Make room for one more record.
    ///
    /// Expired records go first. If the store is still full, the oldest
    /// records by creation time are evicted, at least a tenth of capacity,
    /// so the store does not evict again on the very next insert.
    fn evict(&self) {
        let swept = self.sweep_at(self.clock.now());
        let len = self.entries.len();
        if len < self.max_size {
            debug!(swept, size = len, "Made room in CSRF token store by sweeping");
            return;
        }

        let overflow = len + 1 - self.max_size;
        let target = overflow.max(self.max_size / 10).max(1);

        let mut by_age: Vec<(String, DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().created_at))
            .collect();
        // Only the `target` oldest need to be found, not a full ordering
        if target < by_age.len() {
            by_age.select_nth_unstable_by_key(target, |(_, created_at)| *created_at);
            by_age.truncate(target);
        }

        let mut evicted = 0;
        for (key, created_at) in by_age {
            if self
                .entries
                .remove_if(&key, |_, record| record.created_at == created_at)
                .is_some()
            {
                evicted += 1;
            }
        }

        debug!(
            swept,
            evicted,
            size = self.entries.len(),
            "Evicted oldest CSRF token records"
        );
    }

    /// Start the background sweep on the current tokio runtime.
    ///
    /// Returns `false` if a sweep is already running or there is no runtime.
    /// The task only holds a weak reference, so dropping the store ends it.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut sweeper = self.sweeper.lock();
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No tokio runtime available, CSRF token sweep not started");
                return false;
            }
        };

        let store = Arc::downgrade(self);
        let period = self.sweep_interval;

        *sweeper = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(live) = store.upgrade() else {
                    break;
                };
                let removed = live.sweep();
                if removed > 0 {
                    debug!(removed, remaining = live.len(), "Swept expired CSRF tokens");
                }
            }
        }));

        debug!(interval = ?period, "Started CSRF token sweep");
        true
    }

    /// Stop the background sweep. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        match self.sweeper.lock().take() {
            Some(handle) => {
                handle.abort();
                debug!("Stopped CSRF token sweep");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TokenStore {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("size", &self.entries.len())
            .field("max_size", &self.max_size)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::crypto::SignatureAlgorithm;
    use chrono::Duration as ChronoDuration;

    fn store_with(max: usize) -> (Arc<TokenStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let config = CsrfConfig::default()
            .with_max_store_size(max)
            .with_sweep_interval(Duration::from_secs(300));
        let store = Arc::new(TokenStore::with_clock(&config, clock.clone()));
        (store, clock)
    }

    fn record(clock: &ManualClock, base: &str, ttl_secs: i64) -> TokenRecord {
        let now = clock.now();
        TokenRecord {
            token_base: base.to_string(),
            secret: "secret".to_string(),
            algorithm: SignatureAlgorithm::HmacSha256,
            bound_origin: None,
            rotated_from: None,
            created_at: now,
            expires_at: now + ChronoDuration::seconds(ttl_secs),
        }
    }

    #[test]
    fn test_set_get_overwrite() {
        let (store, clock) = store_with(10);
        store.set("s1", record(&clock, "first", 60));
        store.set("s1", record(&clock, "second", 60));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("s1").unwrap().token_base, "second");
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_lazy_expiry_removes_record() {
        let (store, clock) = store_with(10);
        store.set("s1", record(&clock, "b", 60));

        clock.advance(ChronoDuration::seconds(59));
        assert!(store.get("s1").is_some());

        clock.advance(ChronoDuration::seconds(1));
        assert!(store.get("s1").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_take_is_one_shot() {
        let (store, clock) = store_with(10);
        store.set("s1", record(&clock, "b", 60));

        assert!(store.take("s1", "other").is_none());
        assert!(store.take("s1", "b").is_some());
        assert!(store.take("s1", "b").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_take_ignores_expired() {
        let (store, clock) = store_with(10);
        store.set("s1", record(&clock, "b", 60));
        clock.advance(ChronoDuration::seconds(60));
        assert!(store.take("s1", "b").is_none());
    }

    #[test]
    fn test_delete_and_clear() {
        let (store, clock) = store_with(10);
        store.set("s1", record(&clock, "a", 60));
        store.set("s2", record(&clock, "b", 60));

        assert!(store.delete("s1"));
        assert!(!store.delete("s1"));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (store, clock) = store_with(10);
        store.set("short", record(&clock, "a", 10));
        store.set("long", record(&clock, "b", 600));

        clock.advance(ChronoDuration::seconds(30));
        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("long").is_some());
    }

    #[test]
    fn test_store_never_exceeds_capacity() {
        let (store, clock) = store_with(100);
        for i in 0..1100 {
            clock.advance(ChronoDuration::milliseconds(1));
            store.set(format!("s{}", i), record(&clock, "b", 3600));
            assert!(store.len() <= 100);
        }
    }

    #[test]
    fn test_eviction_prefers_expired_then_oldest() {
        let (store, clock) = store_with(10);
        store.set("expiring", record(&clock, "x", 5));
        for i in 0..9 {
            clock.advance(ChronoDuration::seconds(1));
            store.set(format!("s{}", i), record(&clock, "b", 3600));
        }
        assert_eq!(store.len(), 10);

        // "expiring" is dead by now, so sweeping alone makes room
        clock.advance(ChronoDuration::seconds(1));
        store.set("new", record(&clock, "n", 3600));
        assert_eq!(store.len(), 10);
        assert!(store.get("s0").is_some());

        // Full of live records: the oldest one goes
        clock.advance(ChronoDuration::seconds(1));
        store.set("newer", record(&clock, "n", 3600));
        assert!(store.get("s0").is_none());
        assert!(store.get("newer").is_some());
        assert!(store.len() <= 10);
    }

    #[test]
    fn test_eviction_frees_a_tenth_of_capacity() {
        let (store, clock) = store_with(100);
        for i in 0..100 {
            clock.advance(ChronoDuration::milliseconds(1));
            store.set(format!("s{}", i), record(&clock, "b", 3600));
        }
        assert_eq!(store.len(), 100);

        clock.advance(ChronoDuration::milliseconds(1));
        store.set("new", record(&clock, "n", 3600));

        assert!(store.len() <= 91);
        assert!(store.get("new").is_some());
        for i in 0..10 {
            assert!(store.get(&format!("s{}", i)).is_none(), "s{} kept", i);
        }
        assert!(store.get("s10").is_some());
        assert!(store.get("s99").is_some());
    }

    #[test]
    fn test_stats() {
        let (store, clock) = store_with(10);
        assert_eq!(store.stats().size, 0);
        assert_eq!(store.stats().approximate_memory, 0);

        store.set("s1", record(&clock, "b", 60));
        let stats = store.stats();
        assert_eq!(stats.size, 1);
        assert!(stats.approximate_memory > 0);
    }

    #[test]
    fn test_start_without_runtime() {
        let (store, _clock) = store_with(10);
        assert!(!store.start());
        assert!(!store.is_running());
        assert!(!store.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep() {
        let (store, clock) = store_with(10);
        store.set("s1", record(&clock, "b", 60));

        assert!(store.start());
        assert!(store.is_running());
        assert!(!store.start());

        clock.advance(ChronoDuration::seconds(120));
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(store.len(), 0);

        assert!(store.stop());
        assert!(!store.is_running());
    }
}
