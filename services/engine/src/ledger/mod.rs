//! Per-period exposure accumulation
//!
//! The ledger maps each betting period to the liability accumulated per
//! bet pattern. Writers are concurrent bettors; the single reader is the
//! selector taking a snapshot at freeze time. Increments are atomic per
//! pattern field, never read-modify-write.

mod memory;
mod redis_ledger;

use async_trait::async_trait;
use std::collections::HashMap;

use shared::{Liability, Pattern, PeriodKey};

use crate::errors::{EngineError, Result};

pub use memory::InMemoryExposureLedger;
pub use redis_ledger::RedisExposureLedger;

#[async_trait]
pub trait ExposureLedger: Send + Sync {
    /// Atomically add a bet's liability to each pattern it contributes to.
    ///
    /// Safe under concurrent callers for the same period. A write failure
    /// surfaces to the bet-ingestion caller; the bet must not be accepted
    /// if its exposure tracking failed.
    async fn record_bet(
        &self,
        period: &PeriodKey,
        patterns: &[Pattern],
        delta: Liability,
    ) -> Result<()>;

    /// Read-only view of the period's accumulated exposure.
    ///
    /// Empty when no bets have been recorded, meaning every combination
    /// carries zero exposure.
    async fn snapshot(&self, period: &PeriodKey) -> Result<ExposureSnapshot>;

    /// Release the ledger entry after settlement. No-op if already gone.
    async fn expire(&self, period: &PeriodKey) -> Result<()>;
}

/// Parse the pattern keys supplied with an incoming bet.
///
/// Ingestion boundary: a bet carrying any unrecognized key is rejected
/// whole, before anything reaches storage.
pub fn parse_pattern_keys(raw: &[String]) -> Result<Vec<Pattern>> {
    raw.iter()
        .map(|key| {
            Pattern::parse(key).map_err(|_| EngineError::MalformedPatternKey(key.clone()))
        })
        .collect()
}

/// Immutable pattern -> liability view handed to the evaluator.
#[derive(Debug, Clone, Default)]
pub struct ExposureSnapshot {
    entries: Vec<(Pattern, Liability)>,
    malformed_keys: u32,
}

impl ExposureSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<(Pattern, Liability)>) -> Self {
        Self {
            entries,
            malformed_keys: 0,
        }
    }

    /// Parse raw stored fields, skipping (and counting) malformed keys so
    /// silent ledger corruption stays observable.
    pub fn from_raw<I>(raw: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut entries = Vec::new();
        let mut malformed_keys = 0u32;

        for (field, value) in raw {
            let pattern = match Pattern::parse(&field) {
                Ok(pattern) => pattern,
                Err(_) => {
                    malformed_keys += 1;
                    tracing::warn!(field = %field, "Skipping malformed pattern key in ledger");
                    metrics::counter!("malformed_pattern_keys_total").increment(1);
                    continue;
                }
            };
            let minor = match value.parse::<i64>() {
                Ok(minor) => minor,
                Err(_) => {
                    malformed_keys += 1;
                    tracing::warn!(field = %field, value = %value, "Skipping non-numeric liability in ledger");
                    metrics::counter!("malformed_pattern_keys_total").increment(1);
                    continue;
                }
            };
            entries.push((pattern, Liability::from_total(minor)));
        }

        Self {
            entries,
            malformed_keys,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(Pattern, Liability)] {
        &self.entries
    }

    pub fn malformed_keys(&self) -> u32 {
        self.malformed_keys
    }

    /// Wire form persisted alongside a pre-calculated result.
    pub fn to_json(&self) -> serde_json::Value {
        let map: HashMap<String, i64> = self
            .entries
            .iter()
            .map(|(pattern, liability)| (pattern.encode(), liability.as_minor()))
            .collect();
        serde_json::json!(map)
    }
}
