use crate::services::store::KeyValueStore;
use crate::types::{AssetClass, CacheKey, PriceQuote};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Persisted key prefix for quote entries.
const STORE_PREFIX: &str = "quote:";

/// Freshness windows per pricing class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    /// Equity, index and crypto quotes.
    pub standard: Duration,
    /// Commodity quotes.
    pub commodity: Duration,
}

impl CacheTtl {
    pub fn new(standard: Duration, commodity: Duration) -> Self {
        Self { standard, commodity }
    }

    pub fn for_class(&self, class: AssetClass) -> Duration {
        match class {
            AssetClass::Commodity => self.commodity,
            _ => self.standard,
        }
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            standard: Duration::from_secs(300),
            commodity: Duration::from_secs(900),
        }
    }
}

/// Last known quote for a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub quote: PriceQuote,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(quote: PriceQuote) -> Self {
        Self {
            quote,
            cached_at: Utc::now(),
        }
    }

    /// Fresh while `now - cached_at <= ttl`. Entries stamped in the future count as fresh.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age = (now - self.cached_at).to_std().unwrap_or_default();
        age <= ttl
    }
}

/// TTL-bounded quote cache shared by every lookup.
///
/// The in-memory map is a `DashMap`, so concurrent batch lookups read and
/// write it without external locking. Expired entries are ignored on read
/// and dropped by [`QuoteCache::cleanup`]. When a store is attached every
/// write goes through to it and [`QuoteCache::restore`] rehydrates the map.
pub struct QuoteCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: CacheTtl,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl QuoteCache {
    /// Create an in-memory cache.
    pub fn new(ttl: CacheTtl) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            store: None,
        }
    }

    /// Create a cache that persists entries to `store`.
    pub fn with_store(ttl: CacheTtl, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            store: Some(store),
        }
    }

    pub fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    /// Get a fresh quote for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<PriceQuote> {
        let entry = self.entries.get(key)?;
        if entry.is_fresh(self.ttl.for_class(key.class), Utc::now()) {
            Some(entry.quote.clone())
        } else {
            debug!("Cache entry {} is stale", key);
            None
        }
    }

    /// Get the raw entry regardless of freshness.
    pub fn get_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Store a quote, overwriting any previous entry.
    pub async fn put(&self, key: &CacheKey, quote: PriceQuote) {
        self.put_entry(key, CacheEntry::new(quote)).await;
    }

    /// Store a prepared entry, overwriting any previous entry.
    pub async fn put_entry(&self, key: &CacheKey, entry: CacheEntry) {
        self.entries.insert(key.clone(), entry.clone());

        let Some(store) = &self.store else {
            return;
        };
        let value = match serde_json::to_string(&entry) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = store.set(&format!("{}{}", STORE_PREFIX, key), &value).await {
            warn!("Failed to persist cache entry {}: {}", key, e);
        }
    }

    /// Remove every entry, in memory and in the store.
    pub async fn clear(&self) {
        self.entries.clear();

        let Some(store) = &self.store else {
            return;
        };
        match store.keys().await {
            Ok(keys) => {
                for key in keys.iter().filter(|k| k.starts_with(STORE_PREFIX)) {
                    if let Err(e) = store.remove(key).await {
                        warn!("Failed to remove persisted entry {}: {}", key, e);
                    }
                }
            }
            Err(e) => warn!("Failed to list persisted cache entries: {}", e),
        }
    }

    /// Load persisted entries into memory. Returns the number restored.
    ///
    /// Entries already in memory that are newer than the persisted copy win.
    pub async fn restore(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        let keys = match store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to list persisted cache entries: {}", e);
                return 0;
            }
        };

        let mut restored = 0;
        for raw_key in keys {
            let Some(key) = raw_key
                .strip_prefix(STORE_PREFIX)
                .and_then(|k| k.parse::<CacheKey>().ok())
            else {
                continue;
            };
            let entry = match store.get(&raw_key).await {
                Ok(Some(value)) => match serde_json::from_str::<CacheEntry>(&value) {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Discarding unreadable cache entry {}: {}", raw_key, e);
                        continue;
                    }
                },
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to read cache entry {}: {}", raw_key, e);
                    continue;
                }
            };

            let mut slot = self.entries.entry(key).or_insert_with(|| entry.clone());
            if slot.cached_at < entry.cached_at {
                *slot = entry;
            }
            restored += 1;
        }

        info!("Restored {} cached quotes", restored);
        restored
    }

    /// Drop expired entries from memory. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries
            .retain(|key, entry| entry.is_fresh(self.ttl.for_class(key.class), now));
        before - self.entries.len()
    }

    /// Number of entries in memory (including expired).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
