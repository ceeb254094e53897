//! Result delivery
//!
//! Produces the final outcome for a period with minimal latency: the
//! pre-calculated result when one exists, a synchronous on-demand
//! selection otherwise. The settlement hand-off happens at most once per
//! period regardless of how many callers race through here.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;

use shared::{Combination, PeriodKey};

use crate::errors::Result;
use crate::keys::settlement_queue_key;
use crate::ledger::ExposureLedger;
use crate::selector::{OptimalSelector, ProtectionMode};
use crate::store::{PreCalculatedResult, ResultStore};

/// Downstream consumer of final outcomes (payout/ledger subsystem).
#[async_trait]
pub trait SettlementSink: Send + Sync {
    async fn settle(&self, period: &PeriodKey, result: &PreCalculatedResult)
        -> anyhow::Result<()>;
}

/// Hands outcomes to settlement via a Redis queue.
pub struct RedisQueueSettlementSink {
    redis: ConnectionManager,
}

impl RedisQueueSettlementSink {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SettlementSink for RedisQueueSettlementSink {
    async fn settle(
        &self,
        period: &PeriodKey,
        result: &PreCalculatedResult,
    ) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "game": period.game.as_str(),
            "duration_secs": period.duration_secs,
            "timeline": period.timeline,
            "period_id": period.period_id,
            "combination": result.combination.key(),
            "digits": result.combination.digits(),
            "sum": result.combination.sum(),
            "mode": result.mode.as_str(),
            "settled_at_ms": Utc::now().timestamp_millis(),
        });

        let mut redis_conn = self.redis.clone();
        let _: () = redis_conn
            .rpush(settlement_queue_key(), payload.to_string())
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeliveredResult {
    pub combination: Combination,
    pub mode: ProtectionMode,
    /// False when the pre-calculated result was missing and the outcome
    /// had to be computed on demand.
    pub precalculated: bool,
}

pub struct ResultDelivery {
    ledger: Arc<dyn ExposureLedger>,
    store: Arc<dyn ResultStore>,
    selector: Arc<OptimalSelector>,
    sink: Arc<dyn SettlementSink>,
}

impl ResultDelivery {
    pub fn new(
        ledger: Arc<dyn ExposureLedger>,
        store: Arc<dyn ResultStore>,
        selector: Arc<OptimalSelector>,
        sink: Arc<dyn SettlementSink>,
    ) -> Self {
        Self {
            ledger,
            store,
            selector,
            sink,
        }
    }

    /// Produce the final outcome for a period.
    ///
    /// Idempotent: repeated calls return the same combination, and the
    /// settlement sink fires only for the first caller.
    pub async fn get_result(&self, period: &PeriodKey) -> Result<DeliveredResult> {
        let (record, precalculated) = match self.store.get(period).await? {
            Some(record) => (record, true),
            None => (self.compute_on_demand(period).await?, false),
        };

        // First caller past the marker performs the hand-off.
        if self.store.mark_settled(period).await? {
            if let Err(e) = self.sink.settle(period, &record).await {
                tracing::error!(period = %period, error = %e, "Settlement hand-off failed");
                metrics::counter!("settlement_sink_errors_total").increment(1);
            }
            if let Err(e) = self.ledger.expire(period).await {
                tracing::warn!(period = %period, error = %e, "Failed to release exposure ledger");
            }
        }

        Ok(DeliveredResult {
            combination: record.combination,
            mode: record.mode,
            precalculated,
        })
    }

    /// Slow path when no pre-calculated result exists: select against the
    /// latest snapshot and converge racing callers on one stored record.
    async fn compute_on_demand(&self, period: &PeriodKey) -> Result<PreCalculatedResult> {
        tracing::warn!(period = %period, "No pre-calculated result, computing on demand");
        metrics::counter!("delivery_fallback_total").increment(1);

        let snapshot = self.ledger.snapshot(period).await?;
        let outcome = self.selector.select(&snapshot).await;
        let record = PreCalculatedResult {
            combination: outcome.combination,
            mode: outcome.mode,
            min_liability: outcome.min_liability,
            snapshot: snapshot.to_json(),
            computed_at_ms: Utc::now().timestamp_millis(),
        };

        self.store.put_if_absent(period, &record).await
    }
}
