//! Exposure evaluation
//!
//! Computes the total liability the platform would owe if a given
//! combination were declared the outcome. Pure and allocation-free: the
//! selector invokes it once per catalog entry, up to 100,000 times per
//! selection.

use shared::{Combination, Liability};

use crate::ledger::ExposureSnapshot;

/// Total payout owed for `combination` under the snapshot's bets.
///
/// Patterns the combination does not satisfy contribute zero. Malformed
/// keys never reach this point; they are dropped and counted when the
/// snapshot is parsed.
pub fn evaluate(combination: &Combination, snapshot: &ExposureSnapshot) -> Liability {
    let mut total = Liability::ZERO;
    for (pattern, liability) in snapshot.entries() {
        if combination.matches(pattern) {
            total = total.saturating_add(*liability);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Parity, Pattern, Position, Size};

    fn single(pattern: Pattern, minor: i64) -> ExposureSnapshot {
        ExposureSnapshot::from_entries(vec![(pattern, Liability::from_total(minor))])
    }

    #[test]
    fn test_single_pattern_match_pays_full_amount() {
        let c = Combination::from_key("34567").unwrap(); // sum 25, odd, big

        let cases = [
            (Pattern::ExactSum(25), true),
            (Pattern::ExactSum(24), false),
            (Pattern::SumParity(Parity::Odd), true),
            (Pattern::SumParity(Parity::Even), false),
            (Pattern::SumSize(Size::Big), true),
            (Pattern::SumSize(Size::Small), false),
            (Pattern::PositionExact(Position::A, 3), true),
            (Pattern::PositionExact(Position::A, 4), false),
            (Pattern::PositionParity(Position::B, Parity::Even), true),
            (Pattern::PositionSize(Position::E, Size::Big), true),
            (Pattern::PositionSize(Position::E, Size::Small), false),
        ];

        for (pattern, matches) in cases {
            let expected = if matches { 777 } else { 0 };
            assert_eq!(
                evaluate(&c, &single(pattern, 777)).as_minor(),
                expected,
                "pattern: {}",
                pattern
            );
        }
    }

    #[test]
    fn test_multiple_patterns_accumulate() {
        let c = Combination::from_key("90000").unwrap(); // sum 9, odd, small
        let snapshot = ExposureSnapshot::from_entries(vec![
            (Pattern::SumParity(Parity::Odd), Liability::from_total(100)),
            (Pattern::SumSize(Size::Small), Liability::from_total(200)),
            (Pattern::SumSize(Size::Big), Liability::from_total(999)),
            (
                Pattern::PositionExact(Position::A, 9),
                Liability::from_total(50),
            ),
        ]);
        assert_eq!(evaluate(&c, &snapshot).as_minor(), 350);
    }

    #[test]
    fn test_empty_snapshot_is_zero() {
        let c = Combination::from_key("00000").unwrap();
        assert!(evaluate(&c, &ExposureSnapshot::empty()).is_zero());
    }
}
