// libs/schedule-cell/src/models.rs
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A bookable time window for a doctor at a clinic on one date.
/// Derived from the raw schedule payload, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub id: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub available: bool,
    pub booked_count: i32,
    pub max_bookings: i32,
}

impl TimeSlot {
    pub fn range(&self) -> SlotRange {
        SlotRange {
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SlotRange {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    #[error("A clinic must be selected before slots can be fetched")]
    MissingClinic,

    #[error("Schedule service error: {0}")]
    ServiceError(String),
}

// Field-name variants the scheduling backend has been observed to use.
// Probing is restricted to these lists.
pub(crate) const SLOT_START_KEYS: [&str; 3] = ["from", "start", "startTime"];
pub(crate) const SLOT_END_KEYS: [&str; 3] = ["to", "end", "endTime"];
pub(crate) const SLOT_LIMIT_KEYS: [&str; 2] = ["appointmentLimit", "maxBookings"];
pub(crate) const SLOT_FREE_KEYS: [&str; 2] = ["availableSlots", "freeSlots"];

pub(crate) fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_str))
}

pub(crate) fn num_field(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_f64))
}

/// Parse a clock time as the backend formats it: `"HH:MM"`, `"HH:MM:SS"`
/// or `"HH:MM AM/PM"`. Anything else is None.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(&trimmed.to_uppercase(), "%I:%M %p"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_24h_and_12h_clock_times() {
        assert_eq!(
            parse_clock_time("09:30"),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(
            parse_clock_time("14:05:00"),
            NaiveTime::from_hms_opt(14, 5, 0)
        );
        assert_eq!(
            parse_clock_time("2:15 PM"),
            NaiveTime::from_hms_opt(14, 15, 0)
        );
        assert_eq!(
            parse_clock_time("12:00 am"),
            NaiveTime::from_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn rejects_unparseable_times() {
        assert_eq!(parse_clock_time("half past nine"), None);
        assert_eq!(parse_clock_time(""), None);
        assert_eq!(parse_clock_time("25:00"), None);
    }
}
