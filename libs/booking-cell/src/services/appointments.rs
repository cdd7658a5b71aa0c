use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use shared_api::ApiClient;

use crate::models::{AppointmentRecord, BookAppointmentRequest, BookingError};

pub struct AppointmentClient {
    api: Arc<ApiClient>,
}

impl AppointmentClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Submit the booking. On rejection the server's own message is kept
    /// for the user; an empty body becomes a generic retry prompt.
    pub async fn book_appointment(
        &self,
        request: &BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<AppointmentRecord, BookingError> {
        debug!(
            "Booking appointment for user {} with doctor {} on {}",
            request.user_id, request.doctor_id, request.date
        );

        let body = serde_json::to_value(request)
            .map_err(|e| BookingError::ServiceError(format!("Failed to encode booking: {}", e)))?;

        let result: Value = self
            .api
            .request(Method::POST, "/api/v1/appointments", Some(auth_token), Some(body))
            .await
            .map_err(|e| BookingError::from_server_message(e.server_message()))?;

        let record: AppointmentRecord = serde_json::from_value(result).map_err(|e| {
            BookingError::ServiceError(format!("Failed to parse booked appointment: {}", e))
        })?;

        info!("Appointment {} booked successfully", record.id);
        Ok(record)
    }
}
