//! Typed bet-pattern model
//!
//! Every bettable proposition of the five-dice game is a variant of
//! [`Pattern`]. The engine stores patterns in Redis hash fields using the
//! canonical wire encoding produced by [`Pattern::encode`]; parsing is
//! strict so a corrupted field is detected instead of silently matching
//! nothing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DIGIT_SMALL_BOUND, MAX_SUM, SUM_SMALL_BOUND};

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Malformed pattern key: {0}")]
pub struct PatternParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub fn of(value: u8) -> Parity {
        if value % 2 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Parity::Even => "even",
            Parity::Odd => "odd",
        }
    }

    fn parse(s: &str) -> Option<Parity> {
        match s {
            "even" => Some(Parity::Even),
            "odd" => Some(Parity::Odd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Small,
    Big,
}

impl Size {
    /// Size bucket of a full-combination digit sum.
    pub fn of_sum(sum: u8) -> Size {
        if sum < SUM_SMALL_BOUND {
            Size::Small
        } else {
            Size::Big
        }
    }

    /// Size bucket of a single die.
    pub fn of_digit(digit: u8) -> Size {
        if digit < DIGIT_SMALL_BOUND {
            Size::Small
        } else {
            Size::Big
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Size::Small => "small",
            Size::Big => "big",
        }
    }

    fn parse(s: &str) -> Option<Size> {
        match s {
            "small" => Some(Size::Small),
            "big" => Some(Size::Big),
            _ => None,
        }
    }
}

/// One of the five dice positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    A,
    B,
    C,
    D,
    E,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::A,
        Position::B,
        Position::C,
        Position::D,
        Position::E,
    ];

    pub fn index(&self) -> usize {
        match self {
            Position::A => 0,
            Position::B => 1,
            Position::C => 2,
            Position::D => 3,
            Position::E => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::A => "a",
            Position::B => "b",
            Position::C => "c",
            Position::D => "d",
            Position::E => "e",
        }
    }

    fn parse(s: &str) -> Option<Position> {
        match s {
            "a" => Some(Position::A),
            "b" => Some(Position::B),
            "c" => Some(Position::C),
            "d" => Some(Position::D),
            "e" => Some(Position::E),
            _ => None,
        }
    }
}

/// A bettable proposition that either matches or does not match a
/// combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Pattern {
    /// The digit sum equals the given value (0-45).
    ExactSum(u8),
    /// The digit sum has the given parity.
    SumParity(Parity),
    /// The digit sum falls in the given size bucket.
    SumSize(Size),
    /// The die at the position shows exactly the given digit (0-9).
    PositionExact(Position, u8),
    /// The die at the position has the given parity.
    PositionParity(Position, Parity),
    /// The die at the position falls in the given size bucket.
    PositionSize(Position, Size),
}

impl Pattern {
    /// Canonical wire encoding used as Redis hash field names.
    pub fn encode(&self) -> String {
        match self {
            Pattern::ExactSum(sum) => format!("sum:exact:{}", sum),
            Pattern::SumParity(p) => format!("sum:parity:{}", p.as_str()),
            Pattern::SumSize(s) => format!("sum:size:{}", s.as_str()),
            Pattern::PositionExact(pos, digit) => {
                format!("pos:{}:exact:{}", pos.as_str(), digit)
            }
            Pattern::PositionParity(pos, p) => {
                format!("pos:{}:parity:{}", pos.as_str(), p.as_str())
            }
            Pattern::PositionSize(pos, s) => {
                format!("pos:{}:size:{}", pos.as_str(), s.as_str())
            }
        }
    }

    /// Strict inverse of [`Pattern::encode`].
    ///
    /// Rejects unknown tokens and out-of-range numbers; a rejected key is
    /// counted by the caller, never silently dropped.
    pub fn parse(key: &str) -> Result<Pattern, PatternParseError> {
        let malformed = || PatternParseError(key.to_string());
        let parts: Vec<&str> = key.split(':').collect();

        match parts.as_slice() {
            ["sum", "exact", raw] => {
                let sum: u8 = raw.parse().map_err(|_| malformed())?;
                if sum > MAX_SUM {
                    return Err(malformed());
                }
                Ok(Pattern::ExactSum(sum))
            }
            ["sum", "parity", raw] => Parity::parse(raw)
                .map(Pattern::SumParity)
                .ok_or_else(|| malformed()),
            ["sum", "size", raw] => Size::parse(raw)
                .map(Pattern::SumSize)
                .ok_or_else(|| malformed()),
            ["pos", pos_raw, "exact", raw] => {
                let pos = Position::parse(pos_raw).ok_or_else(|| malformed())?;
                let digit: u8 = raw.parse().map_err(|_| malformed())?;
                if digit > 9 {
                    return Err(malformed());
                }
                Ok(Pattern::PositionExact(pos, digit))
            }
            ["pos", pos_raw, "parity", raw] => {
                let pos = Position::parse(pos_raw).ok_or_else(|| malformed())?;
                let parity = Parity::parse(raw).ok_or_else(|| malformed())?;
                Ok(Pattern::PositionParity(pos, parity))
            }
            ["pos", pos_raw, "size", raw] => {
                let pos = Position::parse(pos_raw).ok_or_else(|| malformed())?;
                let size = Size::parse(raw).ok_or_else(|| malformed())?;
                Ok(Pattern::PositionSize(pos, size))
            }
            _ => Err(malformed()),
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}
