//! Wall-clock period derivation
//!
//! Periods are fixed-duration windows aligned to UTC midnight. The period
//! id is the date plus the zero-padded sequence number of the window
//! within the day, so every engine instance derives identical ids from
//! the clock alone.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use shared::{GameKind, PeriodKey, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodWindow {
    pub key: PeriodKey,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The period window containing `now` for the given duration.
pub fn current_window(
    game: GameKind,
    duration_secs: u32,
    timeline: &str,
    now: DateTime<Utc>,
) -> Result<PeriodWindow, ValidationError> {
    if duration_secs == 0 || duration_secs > 86_400 {
        return Err(ValidationError::InvalidDuration(duration_secs));
    }

    let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let elapsed_secs = (now - day_start).num_seconds().max(0);
    let sequence = elapsed_secs / duration_secs as i64;

    let start = day_start + Duration::seconds(sequence * duration_secs as i64);
    let end = start + Duration::seconds(duration_secs as i64);
    let period_id = format!("{}{:06}", day_start.format("%Y%m%d"), sequence);

    Ok(PeriodWindow {
        key: PeriodKey::new(game, duration_secs, timeline, period_id),
        start,
        end,
    })
}
