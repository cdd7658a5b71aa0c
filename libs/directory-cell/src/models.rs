// libs/directory-cell/src/models.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    #[serde(alias = "fullName", alias = "name")]
    pub full_name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default, alias = "consultationFee", alias = "fee")]
    pub consultation_fee: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clinic {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// Clinic id candidates in the order the backend variants are probed.
const CLINIC_ID_KEYS: [&str; 3] = ["_id", "clinicId", "id"];

/// Pull a clinic id out of a directory record. The directory reports ids
/// under `_id`, `clinicId` or `id` depending on which service produced
/// the record; only these three keys are accepted.
pub fn clinic_id_from_value(value: &Value) -> Option<String> {
    for key in CLINIC_ID_KEYS {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

impl Clinic {
    /// Decode a clinic record, tolerating the id-key variants above.
    /// Records without a usable id or name are dropped by the caller.
    pub fn from_value(value: &Value) -> Option<Clinic> {
        let id = clinic_id_from_value(value)?;
        let name = value.get("name").and_then(Value::as_str)?.to_string();
        let address = value
            .get("address")
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Clinic { id, name, address })
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Directory service error: {0}")]
    ServiceError(String),
}
