//! Scheduling rules for visit dates.

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};

use crate::error::DomainError;

/// 08:00, as minutes after midnight.
pub const WORKDAY_START_MINUTES: u32 = 8 * 60;
/// 18:00, as minutes after midnight. A visit at exactly 18:00 is allowed.
pub const WORKDAY_END_MINUTES: u32 = 18 * 60;
/// How far in the past a scheduled date may be and still count as "now".
pub const SCHEDULE_TOLERANCE_SECS: i64 = 60;

/// Checks a requested visit date and returns it in UTC.
///
/// The date must not lie more than a minute in the past, and its wall-clock
/// time in the caller's own offset must fall within business hours. Seconds
/// are ignored for the hours check, so 18:00:59 still passes.
pub fn validate_schedule(
    scheduled: DateTime<FixedOffset>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, DomainError> {
    let utc = scheduled.with_timezone(&Utc);
    if utc <= now - Duration::seconds(SCHEDULE_TOLERANCE_SECS) {
        return Err(DomainError::Rejected(
            "The visit date and time must be in the future".to_string(),
        ));
    }

    let minutes = scheduled.hour() * 60 + scheduled.minute();
    if !(WORKDAY_START_MINUTES..=WORKDAY_END_MINUTES).contains(&minutes) {
        return Err(DomainError::Rejected(format!(
            "Visits must be scheduled during business hours (08:00 - 18:00); \
             received {:02}:{:02} local time",
            scheduled.hour(),
            scheduled.minute()
        )));
    }

    Ok(utc)
}
