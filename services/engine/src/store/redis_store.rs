//! Redis-backed result store

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use shared::PeriodKey;

use crate::errors::Result;
use crate::keys::{precalc_key, settled_key};

use super::{PreCalculatedResult, ResultStore};

/// Lua script to store a serialized result only when the period has none.
///
/// Keys: [precalc_key]
/// Args: [serialized_result, ttl_ms]
///
/// Returns: the serialized record now stored for the period.
const STORE_IF_ABSENT_SCRIPT: &str = r#"
local existing = redis.call('GET', KEYS[1])
if existing then
  return existing
end
redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
return ARGV[1]
"#;

pub struct RedisResultStore {
    redis: ConnectionManager,
    result_ttl_ms: u64,
}

impl RedisResultStore {
    pub fn new(redis: ConnectionManager, result_ttl_secs: u64) -> Self {
        Self {
            redis,
            result_ttl_ms: result_ttl_secs * 1_000,
        }
    }
}

#[async_trait]
impl ResultStore for RedisResultStore {
    async fn put_if_absent(
        &self,
        period: &PeriodKey,
        result: &PreCalculatedResult,
    ) -> Result<PreCalculatedResult> {
        let serialized =
            serde_json::to_string(result).map_err(|e| anyhow::anyhow!("serialize result: {e}"))?;

        let mut redis_conn = self.redis.clone();
        let script = Script::new(STORE_IF_ABSENT_SCRIPT);
        let stored: String = script
            .key(precalc_key(period))
            .arg(serialized)
            .arg(self.result_ttl_ms)
            .invoke_async(&mut redis_conn)
            .await?;

        let record = serde_json::from_str(&stored)
            .map_err(|e| anyhow::anyhow!("stored result for {period} is malformed: {e}"))?;
        Ok(record)
    }

    async fn get(&self, period: &PeriodKey) -> Result<Option<PreCalculatedResult>> {
        let mut redis_conn = self.redis.clone();
        let raw: Option<String> = redis_conn.get(precalc_key(period)).await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(period = %period, error = %e, "Stored result malformed, treating as absent");
                metrics::counter!("malformed_stored_results_total").increment(1);
                Ok(None)
            }
        }
    }

    async fn mark_settled(&self, period: &PeriodKey) -> Result<bool> {
        let mut redis_conn = self.redis.clone();
        let set: Option<String> = redis::cmd("SET")
            .arg(settled_key(period))
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(self.result_ttl_ms)
            .query_async(&mut redis_conn)
            .await?;
        Ok(set.is_some())
    }
}
