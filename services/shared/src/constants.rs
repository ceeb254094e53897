/// Shared constants for the five-dice outcome engine
///
/// This module centralizes the magic numbers of the game's outcome space
/// to prevent inconsistencies between the engine and collaborating services.

/// Number of dice in one outcome.
pub const DICE_COUNT: usize = 5;

/// Total size of the outcome space (10^5 five-digit combinations).
pub const TOTAL_COMBINATIONS: u32 = 100_000;

/// Maximum digit sum of a combination (five nines).
pub const MAX_SUM: u8 = 45;

/// Digit sums strictly below this bound fall in the `Small` bucket.
///
/// Sums 0-21 are small, 22-45 are big.
pub const SUM_SMALL_BOUND: u8 = 22;

/// Per-position digits strictly below this bound fall in the `Small` bucket.
///
/// Digits 0-4 are small, 5-9 are big.
pub const DIGIT_SMALL_BOUND: u8 = 5;

/// Maximum liability a single bet may contribute, in minor currency units.
///
/// Mirrors the stake caps enforced upstream by bet ingestion. A delta above
/// this is rejected before it reaches storage.
pub const MAX_LIABILITY_DELTA_MINOR: i64 = 1_000_000_000_000;
