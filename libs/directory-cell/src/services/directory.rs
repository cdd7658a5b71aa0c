use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_api::ApiClient;
use shared_models::AppError;

use crate::models::{Clinic, Doctor, DirectoryError};

pub struct DirectoryService {
    api: Arc<ApiClient>,
}

impl DirectoryService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn get_doctor_by_id(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, DirectoryError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/api/v1/doctors/{}", doctor_id);
        let result: Value = self
            .api
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => DirectoryError::DoctorNotFound,
                other => DirectoryError::ServiceError(other.to_string()),
            })?;

        serde_json::from_value(result)
            .map_err(|e| DirectoryError::ServiceError(format!("Failed to parse doctor: {}", e)))
    }

    pub async fn get_all_clinics(&self, auth_token: &str) -> Result<Vec<Clinic>, DirectoryError> {
        debug!("Fetching all clinics");

        let result: Vec<Value> = self
            .api
            .request(Method::GET, "/api/v1/clinics", Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::ServiceError(e.to_string()))?;

        Ok(Self::decode_clinics(result))
    }

    pub async fn get_clinics_by_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Clinic>, DirectoryError> {
        debug!("Fetching clinics for doctor: {}", doctor_id);

        let path = format!("/api/v1/doctors/{}/clinics", doctor_id);
        let result: Vec<Value> = self
            .api
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::ServiceError(e.to_string()))?;

        Ok(Self::decode_clinics(result))
    }

    pub async fn get_doctors_by_clinic(
        &self,
        clinic_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, DirectoryError> {
        debug!("Fetching doctors for clinic: {}", clinic_id);

        if clinic_id.is_empty() {
            return Err(DirectoryError::ClinicNotFound);
        }

        let path = format!("/api/v1/clinics/{}/doctors", clinic_id);
        let result: Vec<Value> = self
            .api
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::ServiceError(e.to_string()))?;

        let doctors: Vec<Doctor> = result
            .into_iter()
            .filter_map(|doc| match serde_json::from_value(doc) {
                Ok(doctor) => Some(doctor),
                Err(e) => {
                    warn!("Skipping malformed doctor record: {}", e);
                    None
                }
            })
            .collect();

        Ok(doctors)
    }

    fn decode_clinics(records: Vec<Value>) -> Vec<Clinic> {
        records
            .iter()
            .filter_map(|record| {
                let clinic = Clinic::from_value(record);
                if clinic.is_none() {
                    warn!("Skipping clinic record without usable id/name");
                }
                clinic
            })
            .collect()
    }
}
