/// Type-safe wrappers for domain primitives
///
/// These types prevent common errors by enforcing validation at construction
/// time and providing checked arithmetic operations.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Digit out of range: {0} (must be 0-9)")]
    DigitOutOfRange(u8),

    #[error("Invalid combination key: {0}")]
    InvalidCombinationKey(String),

    #[error("Liability out of range: {amount} (min: 0, max: {max})")]
    LiabilityOutOfRange { amount: i64, max: i64 },

    #[error("Liability overflow in operation")]
    LiabilityOverflow,

    #[error("Invalid duration: {0} seconds")]
    InvalidDuration(u32),
}

/// Type-safe liability amount in minor currency units
///
/// Negative liabilities are rejected at construction; accumulation across
/// an entire snapshot uses saturating arithmetic so a corrupted ledger can
/// never panic the scan loop.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Liability(i64);

impl Liability {
    pub const ZERO: Liability = Liability(0);

    /// Create a new Liability, validating the per-bet delta bounds.
    pub fn new(minor: i64) -> Result<Self, ValidationError> {
        if minor < 0 || minor > MAX_LIABILITY_DELTA_MINOR {
            return Err(ValidationError::LiabilityOutOfRange {
                amount: minor,
                max: MAX_LIABILITY_DELTA_MINOR,
            });
        }
        Ok(Self(minor))
    }

    /// Create without the per-bet bound check (for accumulated totals).
    pub fn from_total(minor: i64) -> Self {
        Self(minor.max(0))
    }

    /// Raw minor-unit value.
    pub fn as_minor(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Saturating addition, used on the evaluation hot path.
    pub fn saturating_add(self, other: Liability) -> Liability {
        Liability(self.0.saturating_add(other.0))
    }

    /// Checked addition for correctness-critical accumulation.
    pub fn checked_add(self, other: Liability) -> Result<Liability, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Liability)
            .ok_or(ValidationError::LiabilityOverflow)
    }
}

impl std::fmt::Display for Liability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} minor units", self.0)
    }
}

/// Games the exposure engine serves.
///
/// Only the five-dice game carries an exposure-scanned outcome space today;
/// the variant is kept explicit so ledger keys never collide across games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    FiveD,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::FiveD => "5d",
        }
    }
}

impl std::fmt::Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one betting period of one game room.
///
/// The tuple (game, duration, timeline, period id) is the storage key for
/// exposure ledgers, pre-calculated results, and locks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    pub game: GameKind,
    pub duration_secs: u32,
    pub timeline: String,
    pub period_id: String,
}

impl PeriodKey {
    pub fn new(
        game: GameKind,
        duration_secs: u32,
        timeline: impl Into<String>,
        period_id: impl Into<String>,
    ) -> Self {
        Self {
            game,
            duration_secs,
            timeline: timeline.into(),
            period_id: period_id.into(),
        }
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.game, self.duration_secs, self.timeline, self.period_id
        )
    }
}
