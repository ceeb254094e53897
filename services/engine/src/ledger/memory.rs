//! In-memory exposure ledger
//!
//! Used by tests and embedded deployments. The mutex serializes writers,
//! giving the same per-pattern linearizability as the Redis `HINCRBY`
//! path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use shared::{Liability, Pattern, PeriodKey};

use crate::errors::Result;

use super::{ExposureLedger, ExposureSnapshot};

#[derive(Default)]
pub struct InMemoryExposureLedger {
    periods: Mutex<HashMap<PeriodKey, HashMap<Pattern, i64>>>,
}

impl InMemoryExposureLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExposureLedger for InMemoryExposureLedger {
    async fn record_bet(
        &self,
        period: &PeriodKey,
        patterns: &[Pattern],
        delta: Liability,
    ) -> Result<()> {
        let mut periods = self.periods.lock().expect("ledger mutex poisoned");
        let entry = periods.entry(period.clone()).or_default();
        for pattern in patterns {
            let slot = entry.entry(*pattern).or_insert(0);
            *slot = slot.saturating_add(delta.as_minor());
        }
        Ok(())
    }

    async fn snapshot(&self, period: &PeriodKey) -> Result<ExposureSnapshot> {
        let periods = self.periods.lock().expect("ledger mutex poisoned");
        let entries = periods
            .get(period)
            .map(|patterns| {
                patterns
                    .iter()
                    .map(|(pattern, minor)| (*pattern, Liability::from_total(*minor)))
                    .collect()
            })
            .unwrap_or_default();
        Ok(ExposureSnapshot::from_entries(entries))
    }

    async fn expire(&self, period: &PeriodKey) -> Result<()> {
        let mut periods = self.periods.lock().expect("ledger mutex poisoned");
        periods.remove(period);
        Ok(())
    }
}
