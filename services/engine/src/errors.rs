use shared::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Catalog load failed: {0}")]
    CacheLoad(String),

    #[error("Exposure write failed for period {period}: {source}")]
    LedgerWrite {
        period: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("Selection deadline exceeded after {elapsed_ms}ms")]
    SelectionTimeout { elapsed_ms: u64 },

    #[error("Pre-calculation for period {0} already owned by another worker")]
    DuplicateComputation(String),

    #[error("Malformed pattern key: {0}")]
    MalformedPatternKey(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid domain value: {0}")]
    Validation(#[from] ValidationError),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
