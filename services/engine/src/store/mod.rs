//! Pre-calculated result storage
//!
//! Holds the chosen combination per period between freeze and delivery.
//! At most one record exists per period: writers race through
//! `put_if_absent` and every caller converges on the stored winner. A
//! separate settlement marker enforces the exactly-once hand-off.

mod memory;
mod redis_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use shared::{Combination, Liability, PeriodKey};

use crate::errors::Result;
use crate::selector::ProtectionMode;

pub use memory::InMemoryResultStore;
pub use redis_store::RedisResultStore;

/// The persisted decision for one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCalculatedResult {
    pub combination: Combination,
    pub mode: ProtectionMode,
    pub min_liability: Liability,
    /// The exposure snapshot the decision was computed against.
    pub snapshot: serde_json::Value,
    pub computed_at_ms: i64,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Store the record unless one already exists for the period.
    ///
    /// Returns the record that ended up stored, so racing writers all
    /// observe the same decision.
    async fn put_if_absent(
        &self,
        period: &PeriodKey,
        result: &PreCalculatedResult,
    ) -> Result<PreCalculatedResult>;

    /// Fetch the stored record. A malformed stored record reads as
    /// absent so delivery falls back to on-demand computation.
    async fn get(&self, period: &PeriodKey) -> Result<Option<PreCalculatedResult>>;

    /// Set the settlement marker. True only for the first caller.
    async fn mark_settled(&self, period: &PeriodKey) -> Result<bool>;
}
