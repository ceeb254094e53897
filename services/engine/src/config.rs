use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub redis: RedisConfig,
    pub scan: ScanConfig,
    pub precalc: PrecalcConfig,
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Number of disjoint catalog shards scanned concurrently.
    pub chunk_count: usize,
    /// Hard time limit for one full-catalog scan.
    pub deadline_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrecalcConfig {
    /// Period durations (seconds) this engine instance serves.
    pub durations_secs: Vec<u32>,
    pub timeline: String,
    /// How many seconds before period close the pre-calculation fires.
    pub freeze_offset_secs: u64,
    /// TTL of the per-period computation lock.
    pub lock_ttl_ms: u64,
    /// TTL of a stored pre-calculated result.
    pub result_ttl_secs: u64,
    /// Retention of a period's exposure ledger after its last write.
    pub ledger_ttl_secs: u64,
    /// Scheduler tick resolution.
    pub tick_interval_ms: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let durations_secs = env::var("ENGINE_DURATIONS_SECS")
            .unwrap_or_else(|_| "60,180,300,600".to_string())
            .split(',')
            .map(|raw| raw.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Config {
            redis: RedisConfig {
                url: env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            scan: ScanConfig {
                chunk_count: env::var("ENGINE_SCAN_CHUNKS")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()?,
                deadline_ms: env::var("ENGINE_SCAN_DEADLINE_MS")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
            },
            precalc: PrecalcConfig {
                durations_secs,
                timeline: env::var("ENGINE_TIMELINE").unwrap_or_else(|_| "default".to_string()),
                freeze_offset_secs: env::var("ENGINE_FREEZE_OFFSET_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                lock_ttl_ms: env::var("ENGINE_LOCK_TTL_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()?,
                result_ttl_secs: env::var("ENGINE_RESULT_TTL_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()?,
                ledger_ttl_secs: env::var("ENGINE_LEDGER_TTL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()?,
                tick_interval_ms: env::var("ENGINE_TICK_INTERVAL_MS")
                    .unwrap_or_else(|_| "250".to_string())
                    .parse()?,
            },
            metrics_port: env::var("ENGINE_METRICS_PORT")
                .unwrap_or_else(|_| "9091".to_string())
                .parse()?,
        })
    }
}
