// libs/schedule-cell/src/services/resolver.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::join;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_api::ApiClient;

use crate::models::{
    num_field, parse_clock_time, str_field, ScheduleError, TimeSlot, SLOT_END_KEYS,
    SLOT_FREE_KEYS, SLOT_LIMIT_KEYS, SLOT_START_KEYS,
};

pub struct AvailabilityResolver {
    api: Arc<ApiClient>,
}

impl AvailabilityResolver {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Collect the bookable dates for a doctor at a clinic, covering the
    /// requested month and the one after it. A fetch failure yields an
    /// empty set so the caller can render "no availability".
    pub async fn get_bookable_dates(
        &self,
        doctor_id: Uuid,
        clinic_id: &str,
        month: u32,
        year: i32,
        auth_token: &str,
    ) -> BTreeSet<NaiveDate> {
        let (next_month, next_year) = if month == 12 {
            (1, year + 1)
        } else {
            (month + 1, year)
        };

        let (current, next) = join!(
            self.fetch_month(doctor_id, clinic_id, month, year, auth_token),
            self.fetch_month(doctor_id, clinic_id, next_month, next_year, auth_token),
        );

        let mut dates = BTreeSet::new();
        for result in [current, next] {
            match result {
                Ok(entries) => {
                    for entry in &entries {
                        if let Some(date) = Self::bookable_date_from_entry(entry) {
                            dates.insert(date);
                        }
                    }
                }
                Err(e) => {
                    warn!("Monthly schedule fetch failed, treating month as empty: {}", e);
                }
            }
        }

        debug!(
            "Resolved {} bookable dates for doctor {} at clinic {}",
            dates.len(),
            doctor_id,
            clinic_id
        );
        dates
    }

    /// Fetch and normalize the slots for one date. The clinic id is a hard
    /// precondition: without it the caller must send the user back to
    /// clinic selection instead of guessing.
    pub async fn get_slots_for_date(
        &self,
        doctor_id: Uuid,
        clinic_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        if clinic_id.is_empty() {
            return Err(ScheduleError::MissingClinic);
        }

        debug!(
            "Fetching slots for doctor {} at clinic {} on {}",
            doctor_id, clinic_id, date
        );

        let path = format!(
            "/api/v1/appointments/slots?doctor_id={}&clinic_id={}&date={}",
            doctor_id, clinic_id, date
        );
        let raw: Vec<Value> = self
            .api
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::ServiceError(e.to_string()))?;

        let mut slots: Vec<TimeSlot> = raw
            .iter()
            .enumerate()
            .filter_map(|(index, value)| Self::normalize_slot(value, date, index))
            .collect();

        slots.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        slots.dedup_by(|a, b| a.id == b.id);

        // Slot data is not real-time: on the current day, anything that has
        // already started is no longer bookable no matter what the server said.
        if date == now.date_naive() {
            let time_now = now.time();
            for slot in &mut slots {
                if slot.start_time <= time_now {
                    slot.available = false;
                }
            }
        }

        Ok(slots)
    }

    async fn fetch_month(
        &self,
        doctor_id: Uuid,
        clinic_id: &str,
        month: u32,
        year: i32,
        auth_token: &str,
    ) -> Result<Vec<Value>, ScheduleError> {
        let path = format!(
            "/api/v1/appointments/monthly?doctor_id={}&clinic_id={}&month={}&year={}",
            doctor_id, clinic_id, month, year
        );

        self.api
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::ServiceError(e.to_string()))
    }

    /// A monthly entry is either a bare date string or `{date, slots}`.
    /// No `slots` field means the day is open; with slots, at least one
    /// must not be flagged unavailable.
    fn bookable_date_from_entry(entry: &Value) -> Option<NaiveDate> {
        let (date_str, slots) = match entry {
            Value::String(s) => (s.as_str(), None),
            Value::Object(_) => (
                entry.get("date").and_then(Value::as_str)?,
                entry.get("slots").and_then(Value::as_array),
            ),
            _ => return None,
        };

        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;

        let bookable = match slots {
            None => true,
            Some(slots) => slots
                .iter()
                .any(|slot| slot.get("isAvailable").and_then(Value::as_bool) != Some(false)),
        };

        bookable.then_some(date)
    }

    fn normalize_slot(value: &Value, date: NaiveDate, index: usize) -> Option<TimeSlot> {
        let start_raw = str_field(value, &SLOT_START_KEYS)?;
        let end_raw = str_field(value, &SLOT_END_KEYS)?;
        let start_time = parse_clock_time(start_raw)?;
        let end_time = parse_clock_time(end_raw)?;

        let id = value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}-{}", date, start_time.format("%H%M"), index));

        let limit = num_field(value, &SLOT_LIMIT_KEYS);
        let free = num_field(value, &SLOT_FREE_KEYS);

        let booked_count = match (limit, free) {
            (Some(limit), Some(free)) => ((limit - free).max(0.0)) as i32,
            _ => 0,
        };
        let max_bookings = limit.map(|l| l as i32).unwrap_or(0);

        let flagged_available =
            value.get("isAvailable").and_then(Value::as_bool) != Some(false);
        let mut available = flagged_available && free.map(|f| f > 0.0).unwrap_or(true);

        // Capacity wins over whatever flags the server sent.
        if max_bookings > 0 && booked_count >= max_bookings {
            available = false;
        }

        Some(TimeSlot {
            id,
            start_time,
            end_time,
            available,
            booked_count,
            max_bookings,
        })
    }
}
