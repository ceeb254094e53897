//! Combination catalog cache
//!
//! Loads the precomputed combination table once from durable storage and
//! keeps it resident for the process lifetime. The catalog is immutable, so
//! no expiry is applied and the loaded entries are shared freely across
//! scan workers without locking.

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use shared::{Combination, TOTAL_COMBINATIONS};

use crate::errors::{EngineError, Result};
use crate::keys::catalog_key;

/// Durable storage of the precomputed combination table.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Combination>>;
}

/// Catalog table stored as a single Redis hash: field = combination key,
/// value = the precomputed digit sum.
pub struct RedisCatalogSource {
    redis: ConnectionManager,
}

impl RedisCatalogSource {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Write the enumerated table if it is not present yet.
    ///
    /// Returns the number of entries written (0 if the table existed).
    pub async fn seed_if_empty(&self) -> Result<u32> {
        let mut redis_conn = self.redis.clone();

        let exists: bool = redis_conn.exists(catalog_key()).await?;
        if exists {
            return Ok(0);
        }

        let mut batch: Vec<(String, String)> = Vec::with_capacity(10_000);
        for combination in Combination::enumerate() {
            batch.push((combination.key(), combination.sum().to_string()));
            if batch.len() == 10_000 {
                let _: () = redis_conn.hset_multiple(catalog_key(), &batch).await?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            let _: () = redis_conn.hset_multiple(catalog_key(), &batch).await?;
        }

        tracing::info!(entries = TOTAL_COMBINATIONS, "Catalog table seeded");
        Ok(TOTAL_COMBINATIONS)
    }
}

#[async_trait]
impl CatalogSource for RedisCatalogSource {
    async fn fetch_all(&self) -> Result<Vec<Combination>> {
        let mut redis_conn = self.redis.clone();
        let raw: HashMap<String, String> = redis_conn.hgetall(catalog_key()).await?;

        if raw.is_empty() {
            return Err(EngineError::CacheLoad("catalog table is empty".to_string()));
        }

        let mut slots: Vec<Option<Combination>> = vec![None; TOTAL_COMBINATIONS as usize];
        for (key, value) in &raw {
            let combination = Combination::from_key(key).map_err(|_| {
                EngineError::CacheLoad(format!("invalid combination key in table: {}", key))
            })?;
            let stored_sum: u8 = value.parse().map_err(|_| {
                EngineError::CacheLoad(format!("invalid stored sum for {}: {}", key, value))
            })?;
            if stored_sum != combination.sum() {
                return Err(EngineError::CacheLoad(format!(
                    "stored sum {} disagrees with derived sum {} for {}",
                    stored_sum,
                    combination.sum(),
                    key
                )));
            }
            slots[combination.index() as usize] = Some(combination);
        }

        let entries: Vec<Combination> = slots.into_iter().flatten().collect();
        if entries.len() != TOTAL_COMBINATIONS as usize {
            return Err(EngineError::CacheLoad(format!(
                "catalog table incomplete: {} of {} entries",
                entries.len(),
                TOTAL_COMBINATIONS
            )));
        }

        Ok(entries)
    }
}

/// Process-resident cache over the combination catalog.
///
/// Explicitly constructed and injected rather than a module-level
/// singleton, so tests and multi-room deployments can hold independent
/// instances.
pub struct CombinationCache {
    entries: OnceLock<Arc<Vec<Combination>>>,
}

impl CombinationCache {
    pub fn new() -> Self {
        Self {
            entries: OnceLock::new(),
        }
    }

    /// Populate the cache from durable storage.
    ///
    /// Idempotent: returns immediately when already populated. Transient
    /// storage errors are retried briefly before surfacing as
    /// [`EngineError::CacheLoad`]; callers degrade to direct enumeration.
    pub async fn load<S: CatalogSource>(&self, source: &S) -> Result<()> {
        if self.entries.get().is_some() {
            tracing::debug!("Combination cache already loaded");
            return Ok(());
        }

        let retry_policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_interval(Duration::from_secs(2))
            .with_max_elapsed_time(Some(Duration::from_secs(10)))
            .build();

        let entries = backoff::future::retry(retry_policy, || async {
            source.fetch_all().await.map_err(backoff::Error::transient)
        })
        .await?;

        // A concurrent load may have won the race; either value is the
        // same immutable catalog.
        let _ = self.entries.set(Arc::new(entries));
        tracing::info!(entries = TOTAL_COMBINATIONS, "Combination cache loaded");
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.get().is_some()
    }

    /// O(1) lookup of a combination's attributes by canonical key.
    ///
    /// Returns `None` when the cache is unpopulated or the key is invalid.
    pub fn get(&self, key: &str) -> Option<Combination> {
        let entries = self.entries.get()?;
        let index = Combination::from_key(key).ok()?.index();
        entries.get(index as usize).copied()
    }

    /// Lazy, restartable iterator over all cached entries.
    pub fn all(&self) -> Option<impl Iterator<Item = Combination> + '_> {
        self.entries
            .get()
            .map(|entries| entries.iter().copied())
    }

    /// Scan view over the catalog: cached entries when loaded, direct
    /// enumeration otherwise (degraded mode).
    pub fn view(&self) -> CatalogView {
        match self.entries.get() {
            Some(entries) => CatalogView::Cached(entries.clone()),
            None => CatalogView::Direct,
        }
    }
}

impl Default for CombinationCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the catalog handed to scan workers.
#[derive(Clone)]
pub enum CatalogView {
    Cached(Arc<Vec<Combination>>),
    Direct,
}

impl CatalogView {
    pub fn len(&self) -> u32 {
        TOTAL_COMBINATIONS
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, CatalogView::Cached(_))
    }

    pub fn at(&self, index: u32) -> Option<Combination> {
        match self {
            CatalogView::Cached(entries) => entries.get(index as usize).copied(),
            CatalogView::Direct => Combination::from_index(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnumerationSource;

    #[async_trait]
    impl CatalogSource for EnumerationSource {
        async fn fetch_all(&self) -> Result<Vec<Combination>> {
            Ok(Combination::enumerate().collect())
        }
    }

    #[tokio::test]
    async fn test_load_and_get_round_trip() {
        let cache = CombinationCache::new();
        cache.load(&EnumerationSource).await.unwrap();

        assert!(cache.is_loaded());
        for key in ["00000", "34567", "99999"] {
            let cached = cache.get(key).unwrap();
            let derived = Combination::from_key(key).unwrap();
            assert_eq!(cached, derived);
        }
        assert_eq!(cache.all().unwrap().count(), TOTAL_COMBINATIONS as usize);
    }

    #[test]
    fn test_load_is_idempotent() {
        tokio_test::block_on(async {
            let cache = CombinationCache::new();
            cache.load(&EnumerationSource).await.unwrap();
            cache.load(&EnumerationSource).await.unwrap();
            assert!(cache.is_loaded());
        });
    }

    #[tokio::test]
    async fn test_unloaded_cache_degrades() {
        let cache = CombinationCache::new();
        assert!(cache.get("34567").is_none());
        assert!(cache.all().is_none());
        assert!(!cache.view().is_cached());
        // Direct view still serves the full space.
        assert_eq!(
            cache.view().at(34_567),
            Combination::from_key("34567").ok()
        );
    }

    #[tokio::test]
    async fn test_invalid_key_lookup() {
        let cache = CombinationCache::new();
        cache.load(&EnumerationSource).await.unwrap();
        assert!(cache.get("not-a-key").is_none());
        assert!(cache.get("123456").is_none());
    }
}
