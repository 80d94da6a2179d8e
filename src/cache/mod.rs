//! Two-tier, time-boxed cache for dataset loads and derived valuations.
//!
//! The memory tier holds typed values and is authoritative: a hit there never
//! consults the persistent tier. A memory miss falls through to SQLite, and a
//! persisted hit is hydrated back into memory with its original absolute
//! expiry. Expired entries are purged lazily from whichever tier sees them.
//!
//! The persistent tier is best effort. Entries whose serialized form exceeds
//! the per-entry cap stay in memory only, and store failures are logged and
//! absorbed.
//!
//! Every `clear` starts a new generation. A value loaded or read under an
//! older generation is never stored afterwards, so a clear cannot be undone by
//! a computation or hydration that was already in flight.

pub mod generation;
pub mod keys;
pub mod store;

pub use generation::{GenerationToken, Generations};
pub use store::{CacheStoreError, PersistentStore, StoredEntry};

use crate::domain::TimeMs;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-entry cap for the persistent tier (serialized JSON bytes).
pub const DEFAULT_MAX_PERSISTED_BYTES: usize = 4 * 1024 * 1024;

/// Which tiers accepted a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    Persisted,
    MemoryOnly,
    /// A clear ran after the value was produced; neither tier keeps it.
    Superseded,
}

#[derive(Clone)]
struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Option<TimeMs>,
}

impl CacheEntry {
    fn is_expired(&self, now: TimeMs) -> bool {
        self.expires_at.is_some_and(|t| now >= t)
    }
}

pub struct ValuationCache {
    memory: RwLock<HashMap<String, CacheEntry>>,
    store: Option<PersistentStore>,
    max_persisted_bytes: usize,
    generations: Generations,
}

impl std::fmt::Debug for ValuationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValuationCache")
            .field("memory_entries", &self.memory.read().len())
            .field("persistent", &self.store.is_some())
            .field("max_persisted_bytes", &self.max_persisted_bytes)
            .field("generation", &self.generations.current())
            .finish()
    }
}

impl Default for ValuationCache {
    fn default() -> Self {
        Self::memory_only()
    }
}

impl ValuationCache {
    pub fn new(store: Option<PersistentStore>, max_persisted_bytes: usize) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            store,
            max_persisted_bytes,
            generations: Generations::new(),
        }
    }

    pub fn memory_only() -> Self {
        Self::new(None, DEFAULT_MAX_PERSISTED_BYTES)
    }

    /// Advanced by every [`clear`](Self::clear).
    pub fn generations(&self) -> &Generations {
        &self.generations
    }

    /// Number of entries currently held in memory, expired or not.
    pub fn memory_len(&self) -> usize {
        self.memory.read().len()
    }

    /// Look up a live entry, hydrating memory from the persistent tier on a miss.
    pub async fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let now = TimeMs::now();
        let token = self.generations.token();

        if let Some(value) = self.get_memory::<T>(key, now) {
            return Some(value);
        }

        let store = self.store.as_ref()?;
        let stored = match store.get(key, now).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache store read failed");
                return None;
            }
        };

        let value: T = match serde_json::from_slice(&stored.json) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable persisted entry");
                if let Err(e) = store.remove(key).await {
                    warn!(key = %key, error = %e, "Cache store delete failed");
                }
                return None;
            }
        };

        let value = Arc::new(value);
        let mut memory = self.memory.write();
        // Checked under the lock `clear` holds while advancing: a row read
        // before a clear swept it must not come back.
        if !token.is_current() {
            debug!(key = %key, "Cache cleared during store read; dropping entry");
            return None;
        }
        debug!(key = %key, "Hydrated cache entry from persistent tier");
        memory.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expires_at: stored.expires_at,
            },
        );
        Some(value)
    }

    fn get_memory<T>(&self, key: &str, now: TimeMs) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let entry = self.memory.read().get(key).cloned()?;
        if entry.is_expired(now) {
            debug!(key = %key, "Purging expired memory entry");
            let mut memory = self.memory.write();
            // Re-check under the write lock; a fresh value may have landed.
            if memory.get(key).is_some_and(|e| e.is_expired(now)) {
                memory.remove(key);
            }
            return None;
        }
        entry.value.downcast::<T>().ok()
    }

    /// Store a value in memory and, when it fits, in the persistent tier.
    ///
    /// `ttl = None` never expires.
    pub async fn set<T>(&self, key: &str, value: T, ttl: Option<Duration>) -> CacheWrite
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.set_shared(key, Arc::new(value), ttl).await
    }

    pub async fn set_shared<T>(&self, key: &str, value: Arc<T>, ttl: Option<Duration>) -> CacheWrite
    where
        T: Serialize + Send + Sync + 'static,
    {
        let token = self.generations.token();
        self.publish(key, value, ttl, &token).await
    }

    /// Store `value` unless a clear has happened since `token` was taken.
    async fn publish<T>(
        &self,
        key: &str,
        value: Arc<T>,
        ttl: Option<Duration>,
        token: &GenerationToken,
    ) -> CacheWrite
    where
        T: Serialize + Send + Sync + 'static,
    {
        let now = TimeMs::now();
        let expires_at = ttl.map(|ttl| now.saturating_add(ttl));

        // Serialize before publishing so the memory lock is never held across it.
        let json = match self.store {
            Some(_) => match serde_json::to_vec(value.as_ref()) {
                Ok(json) => Some(json),
                Err(e) => {
                    warn!(
                        key = %key,
                        error = %e,
                        "Cache entry not serializable; keeping in memory"
                    );
                    None
                }
            },
            None => None,
        };

        {
            let mut memory = self.memory.write();
            if !token.is_current() {
                debug!(key = %key, "Cache cleared while value was produced; not storing");
                return CacheWrite::Superseded;
            }
            memory.insert(
                key.to_string(),
                CacheEntry {
                    value,
                    expires_at,
                },
            );
        }

        let (Some(store), Some(json)) = (self.store.as_ref(), json) else {
            return CacheWrite::MemoryOnly;
        };

        if json.len() > self.max_persisted_bytes {
            warn!(
                key = %key,
                size_bytes = json.len(),
                max_bytes = self.max_persisted_bytes,
                "Cache entry too large to persist; keeping in memory only"
            );
            // A previous persisted copy would outlive the new value.
            if let Err(e) = store.remove(key).await {
                warn!(key = %key, error = %e, "Cache store delete failed");
            }
            return CacheWrite::MemoryOnly;
        }

        match store.put(key, &json, expires_at, now).await {
            Ok(()) if token.is_current() => CacheWrite::Persisted,
            Ok(()) => {
                // The clear may have swept the store before this row landed.
                debug!(key = %key, "Cache cleared during persist; dropping row");
                if let Err(e) = store.remove(key).await {
                    warn!(key = %key, error = %e, "Cache store delete failed");
                }
                CacheWrite::Superseded
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache store write failed; keeping in memory only");
                CacheWrite::MemoryOnly
            }
        }
    }

    /// Return the cached value, or compute, store and return it.
    ///
    /// Failures of `load` are returned as is and nothing is cached. A value
    /// whose load overlapped a clear is returned to the caller but not stored.
    pub async fn get_or_try_insert_with<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        load: F,
    ) -> Result<Arc<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let token = self.generations.token();
        if let Some(value) = self.get::<T>(key).await {
            return Ok(value);
        }
        let value = Arc::new(load().await?);
        self.publish(key, value.clone(), ttl, &token).await;
        Ok(value)
    }

    /// Clear both tiers entirely, or only keys starting with `prefix`.
    ///
    /// Returns the token of the generation the clear started.
    pub async fn clear(&self, prefix: Option<&str>) -> GenerationToken {
        let token = {
            let mut memory = self.memory.write();
            let token = self.generations.advance();
            match prefix {
                None => memory.clear(),
                Some(prefix) => memory.retain(|key, _| !key.starts_with(prefix)),
            }
            token
        };

        if let Some(store) = &self.store {
            match store.clear(prefix).await {
                Ok(removed) => debug!(prefix = ?prefix, removed, "Cleared persisted cache entries"),
                Err(e) => warn!(prefix = ?prefix, error = %e, "Cache store clear failed"),
            }
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        values: Vec<u32>,
    }

    fn payload(name: &str) -> Payload {
        Payload {
            name: name.to_string(),
            values: vec![1, 2, 3],
        }
    }

    async fn persistent(dir: &TempDir, max_bytes: usize) -> (ValuationCache, PersistentStore) {
        let db_path = dir.path().join("cache.db").to_string_lossy().to_string();
        let store = PersistentStore::open(&db_path).await.unwrap();
        (ValuationCache::new(Some(store.clone()), max_bytes), store)
    }

    #[tokio::test]
    async fn test_memory_only_set_get() {
        let cache = ValuationCache::memory_only();
        assert_eq!(cache.set("a", payload("a"), None).await, CacheWrite::MemoryOnly);
        let hit = cache.get::<Payload>("a").await.unwrap();
        assert_eq!(*hit, payload("a"));
        assert!(cache.get::<Payload>("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_wrong_type_is_a_miss() {
        let cache = ValuationCache::memory_only();
        cache.set("a", payload("a"), None).await;
        assert!(cache.get::<String>("a").await.is_none());
    }

    #[tokio::test]
    async fn test_ttl_expires_in_both_tiers() {
        let dir = TempDir::new().unwrap();
        let (cache, store) = persistent(&dir, DEFAULT_MAX_PERSISTED_BYTES).await;

        let written = cache
            .set("k", payload("k"), Some(Duration::from_millis(100)))
            .await;
        assert_eq!(written, CacheWrite::Persisted);
        assert!(cache.get::<Payload>("k").await.is_some());
        assert!(store.get("k", TimeMs::now()).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get::<Payload>("k").await.is_none());
        assert!(store.get("k", TimeMs::now()).await.unwrap().is_none());
        assert_eq!(cache.memory_len(), 0);
    }

    #[tokio::test]
    async fn test_memory_miss_hydrates_from_persistent_tier() {
        let dir = TempDir::new().unwrap();
        let (cache, store) = persistent(&dir, DEFAULT_MAX_PERSISTED_BYTES).await;
        cache
            .set("k", payload("k"), Some(Duration::from_secs(60)))
            .await;

        let fresh = ValuationCache::new(Some(store.clone()), DEFAULT_MAX_PERSISTED_BYTES);
        assert_eq!(fresh.memory_len(), 0);
        let hit = fresh.get::<Payload>("k").await.unwrap();
        assert_eq!(*hit, payload("k"));
        assert_eq!(fresh.memory_len(), 1);

        // Hydrated entry keeps serving after the row is gone.
        store.clear(None).await.unwrap();
        assert!(fresh.get::<Payload>("k").await.is_some());
    }

    #[tokio::test]
    async fn test_oversized_entry_stays_in_memory_only() {
        let dir = TempDir::new().unwrap();
        let (cache, store) = persistent(&dir, 16).await;

        let big = Payload {
            name: "x".repeat(64),
            values: vec![],
        };
        assert_eq!(cache.set("big", big.clone(), None).await, CacheWrite::MemoryOnly);
        assert_eq!(*cache.get::<Payload>("big").await.unwrap(), big);
        assert!(store.get("big", TimeMs::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_rewrite_drops_stale_persisted_copy() {
        let dir = TempDir::new().unwrap();
        let (cache, store) = persistent(&dir, 32).await;

        assert_eq!(cache.set("k", 1u32, None).await, CacheWrite::Persisted);
        cache.set("k", "y".repeat(64), None).await;
        assert!(store.get("k", TimeMs::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_by_prefix_and_all() {
        let dir = TempDir::new().unwrap();
        let (cache, store) = persistent(&dir, DEFAULT_MAX_PERSISTED_BYTES).await;
        cache.set(&keys::prices(), 1u32, None).await;
        cache.set(&keys::set_list(), 2u32, None).await;
        cache.set("valuation:MKM:0", 3u32, None).await;

        cache.clear(Some(keys::DATASET_PREFIX)).await;
        assert!(cache.get::<u32>(&keys::prices()).await.is_none());
        assert!(cache.get::<u32>(&keys::set_list()).await.is_none());
        assert_eq!(*cache.get::<u32>("valuation:MKM:0").await.unwrap(), 3);
        assert_eq!(store.len().await.unwrap(), 1);

        cache.clear(None).await;
        assert!(cache.get::<u32>("valuation:MKM:0").await.is_none());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_tier_is_authoritative() {
        let dir = TempDir::new().unwrap();
        let (cache, store) = persistent(&dir, DEFAULT_MAX_PERSISTED_BYTES).await;
        cache.set("k", 1u32, None).await;

        // Overwrite the row behind the cache's back; memory still wins.
        store.put("k", b"2", None, TimeMs::now()).await.unwrap();
        assert_eq!(*cache.get::<u32>("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_load_overlapping_clear_is_returned_but_not_stored() {
        let dir = TempDir::new().unwrap();
        let (cache, store) = persistent(&dir, DEFAULT_MAX_PERSISTED_BYTES).await;

        let value = cache
            .get_or_try_insert_with("valuation:MKM:0", None, || async {
                cache.clear(None).await;
                Ok::<_, String>(1u32)
            })
            .await
            .unwrap();
        assert_eq!(*value, 1);

        assert!(cache.get::<u32>("valuation:MKM:0").await.is_none());
        assert_eq!(cache.memory_len(), 0);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_publish_with_stale_token_is_superseded() {
        let dir = TempDir::new().unwrap();
        let (cache, store) = persistent(&dir, DEFAULT_MAX_PERSISTED_BYTES).await;
        let token = cache.generations().token();

        let cleared = cache.clear(Some(keys::VALUATION_PREFIX)).await;
        assert_eq!(cleared.generation(), token.generation() + 1);

        let written = cache.publish("k", Arc::new(1u32), None, &token).await;
        assert_eq!(written, CacheWrite::Superseded);
        assert_eq!(cache.memory_len(), 0);
        assert_eq!(store.len().await.unwrap(), 0);

        // Writes taken after the clear go through.
        assert_eq!(cache.set("k", 2u32, None).await, CacheWrite::Persisted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hydration_racing_clear_never_resurrects_entry() {
        let dir = TempDir::new().unwrap();
        let (cache, store) = persistent(&dir, DEFAULT_MAX_PERSISTED_BYTES).await;

        for _ in 0..25 {
            // Only the store holds the row, so `get` has to read it.
            store.put("k", b"1", None, TimeMs::now()).await.unwrap();
            let _ = tokio::join!(cache.get::<u32>("k"), cache.clear(None));

            assert_eq!(cache.memory_len(), 0);
            assert_eq!(store.len().await.unwrap(), 0);
            assert!(cache.get::<u32>("k").await.is_none());
        }
    }

    #[tokio::test]
    async fn test_get_or_try_insert_with_loads_once() {
        let cache = ValuationCache::memory_only();
        let calls = std::sync::atomic::AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with("k", None, || async {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok::<_, String>(7u32)
                })
                .await
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_try_insert_with_does_not_cache_errors() {
        let cache = ValuationCache::memory_only();
        let result = cache
            .get_or_try_insert_with::<u32, _, _, _>("k", None, || async { Err("down") })
            .await;
        assert_eq!(result.unwrap_err(), "down");
        assert_eq!(cache.memory_len(), 0);
    }
}
