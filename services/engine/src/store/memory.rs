//! In-memory result store for tests and embedded use

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use shared::PeriodKey;

use crate::errors::Result;

use super::{PreCalculatedResult, ResultStore};

#[derive(Default)]
pub struct InMemoryResultStore {
    results: Mutex<HashMap<PeriodKey, PreCalculatedResult>>,
    settled: Mutex<HashSet<PeriodKey>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn put_if_absent(
        &self,
        period: &PeriodKey,
        result: &PreCalculatedResult,
    ) -> Result<PreCalculatedResult> {
        let mut results = self.results.lock().expect("result store mutex poisoned");
        Ok(results
            .entry(period.clone())
            .or_insert_with(|| result.clone())
            .clone())
    }

    async fn get(&self, period: &PeriodKey) -> Result<Option<PreCalculatedResult>> {
        let results = self.results.lock().expect("result store mutex poisoned");
        Ok(results.get(period).cloned())
    }

    async fn mark_settled(&self, period: &PeriodKey) -> Result<bool> {
        let mut settled = self.settled.lock().expect("settled mutex poisoned");
        Ok(settled.insert(period.clone()))
    }
}
