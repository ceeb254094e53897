//! Redis-backed exposure ledger
//!
//! One Redis hash per period; fields are encoded patterns, values are
//! accumulated minor-unit liabilities. `HINCRBY` keeps each field update
//! linearizable under concurrent bettors without application-level locks.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;

use shared::{Liability, Pattern, PeriodKey};

use crate::errors::{EngineError, Result};
use crate::keys::exposure_key;

use super::{ExposureLedger, ExposureSnapshot};

pub struct RedisExposureLedger {
    redis: ConnectionManager,
    ledger_ttl_secs: u64,
}

impl RedisExposureLedger {
    pub fn new(redis: ConnectionManager, ledger_ttl_secs: u64) -> Self {
        Self {
            redis,
            ledger_ttl_secs,
        }
    }
}

#[async_trait]
impl ExposureLedger for RedisExposureLedger {
    async fn record_bet(
        &self,
        period: &PeriodKey,
        patterns: &[Pattern],
        delta: Liability,
    ) -> Result<()> {
        if patterns.is_empty() {
            return Ok(());
        }

        let key = exposure_key(period);
        let mut redis_conn = self.redis.clone();

        let mut pipe = redis::pipe();
        pipe.atomic();
        for pattern in patterns {
            pipe.hincr(&key, pattern.encode(), delta.as_minor()).ignore();
        }
        // Retention is bounded even if settlement never expires the entry.
        pipe.expire(&key, self.ledger_ttl_secs as i64).ignore();

        let write: std::result::Result<(), redis::RedisError> =
            pipe.query_async(&mut redis_conn).await;
        write.map_err(|source| EngineError::LedgerWrite {
            period: period.to_string(),
            source,
        })?;

        Ok(())
    }

    async fn snapshot(&self, period: &PeriodKey) -> Result<ExposureSnapshot> {
        let mut redis_conn = self.redis.clone();
        let raw: HashMap<String, String> = redis_conn.hgetall(exposure_key(period)).await?;
        Ok(ExposureSnapshot::from_raw(raw))
    }

    async fn expire(&self, period: &PeriodKey) -> Result<()> {
        let mut redis_conn = self.redis.clone();
        let _: () = redis_conn.del(exposure_key(period)).await?;
        Ok(())
    }
}
