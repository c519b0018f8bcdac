use moka::future::Cache;
use quill::domain::{CacheEntry, CacheStats};
use quill::ports::KeyValueStore;
use serde_json::Value;
use shared::TtlMs;
use std::sync::Arc;
use tracing::warn;

/// Durable-tier key namespace. Keeping cached entries apart from session
/// keys means clearing the cache never logs the user out.
const DURABLE_PREFIX: &str = "cache_";

/// Two-tier TTL cache: a moka in-memory tier over a durable store.
///
/// Reads check memory first and fall back to the durable tier, promoting
/// hits back into memory. Expiry is enforced lazily on read in both
/// tiers; durable writes are best-effort, the in-memory copy stays
/// authoritative for the running process.
pub struct LocalCache {
    memory: Cache<String, CacheEntry>,
    durable: Arc<dyn KeyValueStore>,
}

impl LocalCache {
    pub fn new(durable: Arc<dyn KeyValueStore>) -> Self {
        Self {
            memory: Cache::builder().build(),
            durable,
        }
    }

    /// Bound the memory tier; the durable tier is unbounded either way.
    pub fn bounded(durable: Arc<dyn KeyValueStore>, max_entries: u64) -> Self {
        Self {
            memory: Cache::builder().max_capacity(max_entries).build(),
            durable,
        }
    }

    /// Store a value under the given TTL in both tiers.
    pub async fn set(&self, key: &str, value: Value, ttl: TtlMs) {
        let entry = CacheEntry::new(value, ttl);
        self.memory.insert(key.to_string(), entry.clone()).await;

        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(e) = self.durable.set(&durable_key(key), &json).await {
                    warn!("Durable cache write failed for {}: {}", key, e);
                }
            }
            Err(e) => warn!("Failed to serialize cache entry for {}: {}", key, e),
        }
    }

    /// Look up a key. Expired entries are dropped from the tier they were
    /// found in; durable hits are promoted into memory.
    pub async fn get(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.memory.get(key).await {
            if entry.is_expired() {
                self.memory.invalidate(key).await;
            } else {
                return Some(entry.value);
            }
        }

        let raw = match self.durable.get(&durable_key(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Durable cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Corrupt durable cache entry for {}, dropping it: {}", key, e);
                let _ = self.durable.remove(&durable_key(key)).await;
                return None;
            }
        };

        if entry.is_expired() {
            if let Err(e) = self.durable.remove(&durable_key(key)).await {
                warn!("Failed to drop expired durable entry {}: {}", key, e);
            }
            return None;
        }

        self.memory.insert(key.to_string(), entry.clone()).await;
        Some(entry.value)
    }

    /// Remove a key from both tiers.
    pub async fn delete(&self, key: &str) {
        self.memory.invalidate(key).await;
        if let Err(e) = self.durable.remove(&durable_key(key)).await {
            warn!("Durable cache delete failed for {}: {}", key, e);
        }
    }

    /// Drop every cached entry. Only `cache_`-prefixed durable keys are
    /// touched; unrelated state sharing the store survives.
    pub async fn clear(&self) {
        self.memory.invalidate_all();

        match self.durable.keys_with_prefix(DURABLE_PREFIX).await {
            Ok(keys) => {
                for key in keys {
                    if let Err(e) = self.durable.remove(&key).await {
                        warn!("Failed to remove durable cache key {}: {}", key, e);
                    }
                }
            }
            Err(e) => warn!("Failed to enumerate durable cache keys: {}", e),
        }
    }

    /// Entry counts per tier.
    pub async fn stats(&self) -> CacheStats {
        self.memory.run_pending_tasks().await;

        let durable_entries = match self.durable.keys_with_prefix(DURABLE_PREFIX).await {
            Ok(keys) => keys.len() as u64,
            Err(e) => {
                warn!("Failed to count durable cache keys: {}", e);
                0
            }
        };

        CacheStats {
            memory_entries: self.memory.entry_count(),
            durable_entries,
        }
    }
}

fn durable_key(key: &str) -> String {
    format!("{}{}", DURABLE_PREFIX, key)
}
