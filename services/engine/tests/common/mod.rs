//! Shared helpers for engine integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use engine::cache::{CatalogSource, CombinationCache};
use engine::config::ScanConfig;
use engine::delivery::SettlementSink;
use engine::errors::Result;
use engine::selector::OptimalSelector;
use engine::store::PreCalculatedResult;
use shared::{Combination, GameKind, PeriodKey};

/// Catalog source backed by direct enumeration, standing in for the
/// seeded Redis table.
pub struct EnumerationSource;

#[async_trait]
impl CatalogSource for EnumerationSource {
    async fn fetch_all(&self) -> Result<Vec<Combination>> {
        Ok(Combination::enumerate().collect())
    }
}

/// Settlement sink that only counts hand-offs.
#[derive(Default)]
pub struct CountingSink {
    calls: AtomicU32,
}

impl CountingSink {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettlementSink for CountingSink {
    async fn settle(&self, _period: &PeriodKey, _result: &PreCalculatedResult) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub async fn loaded_cache() -> CombinationCache {
    let cache = CombinationCache::new();
    cache.load(&EnumerationSource).await.unwrap();
    cache
}

pub fn scan_config() -> ScanConfig {
    ScanConfig {
        chunk_count: 4,
        deadline_ms: 10_000,
    }
}

pub async fn selector() -> Arc<OptimalSelector> {
    let cache = loaded_cache().await;
    Arc::new(OptimalSelector::new(cache.view(), &scan_config()))
}

pub fn period(id: &str) -> PeriodKey {
    PeriodKey::new(GameKind::FiveD, 60, "default", id)
}
