use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_api::ApiClient;

use crate::models::{parse_clock_time, ScheduleError, SlotRange};

pub struct ConflictGuard {
    api: Arc<ApiClient>,
}

impl ConflictGuard {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// True when the selection lies in the past relative to `now`.
    /// Dates compare day-only; on the current day the slot's clock time
    /// decides. An unparseable time never blocks the user.
    pub fn is_past_selection(date: NaiveDate, time_str: &str, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();

        if date < today {
            return true;
        }
        if date > today {
            return false;
        }

        match parse_clock_time(time_str) {
            Some(time) => time <= now.time(),
            None => false,
        }
    }

    /// Ask the appointment service whether the user already holds a booking
    /// overlapping this doctor/clinic/date/time window. Errors propagate:
    /// a failed check must block the booking, not wave it through.
    pub async fn has_existing_booking(
        &self,
        user_id: Uuid,
        doctor_id: Uuid,
        clinic_id: &str,
        date: NaiveDate,
        range: &SlotRange,
        auth_token: &str,
    ) -> Result<bool, ScheduleError> {
        debug!(
            "Checking existing booking for user {} with doctor {} on {}",
            user_id, doctor_id, date
        );

        let path = format!(
            "/api/v1/appointments/check?user_id={}&doctor_id={}&clinic_id={}&date={}&from={}&to={}",
            user_id,
            doctor_id,
            clinic_id,
            date,
            range.start_time.format("%H:%M"),
            range.end_time.format("%H:%M"),
        );

        let result: Value = self
            .api
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::ServiceError(e.to_string()))?;

        let exists = result
            .as_bool()
            .or_else(|| result.get("exists").and_then(Value::as_bool))
            .unwrap_or(false);

        if exists {
            warn!(
                "User {} already holds a booking with doctor {} on {}",
                user_id, doctor_id, date
            );
        }

        Ok(exists)
    }
}
