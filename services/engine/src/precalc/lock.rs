//! Per-period computation lock
//!
//! The sole mutual-exclusion point of the engine: prevents two scheduler
//! instances from computing the same period twice. Acquisition is
//! `SET NX PX` with a random token; release only deletes when the token
//! still matches, so an expired lock taken over by another worker is
//! never released from under it.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use shared::PeriodKey;

use crate::errors::Result;
use crate::keys::lock_key;

/// Lua script for token-checked lock release.
///
/// Keys: [lock_key]
/// Args: [token]
///
/// Returns: 1 if released, 0 if the lock was not held with this token.
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
end
return 0
"#;

#[async_trait]
pub trait PeriodLock: Send + Sync {
    /// Try to take the period's lock. `None` means another worker owns it.
    async fn acquire(&self, period: &PeriodKey) -> Result<Option<String>>;

    /// Release a lock previously acquired with `token`.
    async fn release(&self, period: &PeriodKey, token: &str) -> Result<()>;
}

pub struct RedisPeriodLock {
    redis: ConnectionManager,
    lock_ttl_ms: u64,
}

impl RedisPeriodLock {
    pub fn new(redis: ConnectionManager, lock_ttl_ms: u64) -> Self {
        Self { redis, lock_ttl_ms }
    }
}

#[async_trait]
impl PeriodLock for RedisPeriodLock {
    async fn acquire(&self, period: &PeriodKey) -> Result<Option<String>> {
        let token = Uuid::new_v4().to_string();
        let mut redis_conn = self.redis.clone();

        let set: Option<String> = redis::cmd("SET")
            .arg(lock_key(period))
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(self.lock_ttl_ms)
            .query_async(&mut redis_conn)
            .await?;

        Ok(set.map(|_| token))
    }

    async fn release(&self, period: &PeriodKey, token: &str) -> Result<()> {
        let mut redis_conn = self.redis.clone();
        let script = Script::new(RELEASE_LOCK_SCRIPT);
        let _: i32 = script
            .key(lock_key(period))
            .arg(token)
            .invoke_async(&mut redis_conn)
            .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPeriodLock {
    held: Mutex<HashMap<PeriodKey, String>>,
}

impl InMemoryPeriodLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PeriodLock for InMemoryPeriodLock {
    async fn acquire(&self, period: &PeriodKey) -> Result<Option<String>> {
        let mut held = self.held.lock().expect("lock mutex poisoned");
        if held.contains_key(period) {
            return Ok(None);
        }
        let token = Uuid::new_v4().to_string();
        held.insert(period.clone(), token.clone());
        Ok(Some(token))
    }

    async fn release(&self, period: &PeriodKey, token: &str) -> Result<()> {
        let mut held = self.held.lock().expect("lock mutex poisoned");
        if held.get(period).map(String::as_str) == Some(token) {
            held.remove(period);
        }
        Ok(())
    }
}
