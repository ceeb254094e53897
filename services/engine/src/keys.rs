//! Redis key generation functions
//!
//! Centralizes all Redis key patterns used for the catalog table, exposure
//! ledgers, pre-calculated results, computation locks, and settlement
//! markers.

use shared::PeriodKey;

/// Redis key for the precomputed combination table.
const CATALOG_KEY: &str = "catalog:fived";

/// Redis key prefix for per-period exposure ledgers.
const EXPOSURE_KEY_PREFIX: &str = "exposure:";

/// Redis key prefix for pre-calculated results.
const PRECALC_KEY_PREFIX: &str = "precalc:";

/// Redis key prefix for per-period computation locks.
const LOCK_KEY_PREFIX: &str = "lock:precalc:";

/// Redis key prefix for settlement hand-off markers.
const SETTLED_KEY_PREFIX: &str = "settled:";

/// Redis key for the downstream settlement queue.
const SETTLEMENT_QUEUE_KEY: &str = "settlement:queue";

/// Get Redis key for the combination catalog table.
pub fn catalog_key() -> &'static str {
    CATALOG_KEY
}

/// Generate Redis key for a period's exposure ledger hash.
pub fn exposure_key(period: &PeriodKey) -> String {
    format!("{}{}", EXPOSURE_KEY_PREFIX, period)
}

/// Generate Redis key for a period's pre-calculated result.
pub fn precalc_key(period: &PeriodKey) -> String {
    format!("{}{}", PRECALC_KEY_PREFIX, period)
}

/// Generate Redis key for a period's computation lock.
pub fn lock_key(period: &PeriodKey) -> String {
    format!("{}{}", LOCK_KEY_PREFIX, period)
}

/// Generate Redis key for a period's settlement marker.
pub fn settled_key(period: &PeriodKey) -> String {
    format!("{}{}", SETTLED_KEY_PREFIX, period)
}

/// Get Redis key for the settlement hand-off queue.
pub fn settlement_queue_key() -> &'static str {
    SETTLEMENT_QUEUE_KEY
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::GameKind;

    fn period() -> PeriodKey {
        PeriodKey::new(GameKind::FiveD, 60, "default", "20260804000123")
    }

    #[test]
    fn test_exposure_key_format() {
        assert_eq!(
            exposure_key(&period()),
            "exposure:5d:60:default:20260804000123"
        );
    }

    #[test]
    fn test_precalc_key_format() {
        assert_eq!(
            precalc_key(&period()),
            "precalc:5d:60:default:20260804000123"
        );
    }

    #[test]
    fn test_lock_and_marker_key_formats() {
        assert_eq!(
            lock_key(&period()),
            "lock:precalc:5d:60:default:20260804000123"
        );
        assert_eq!(
            settled_key(&period()),
            "settled:5d:60:default:20260804000123"
        );
    }

    #[test]
    fn test_static_keys() {
        assert_eq!(catalog_key(), "catalog:fived");
        assert_eq!(settlement_queue_key(), "settlement:queue");
    }
}
