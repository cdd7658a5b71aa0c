use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalized view of one subscription entry, whatever shape it arrived in.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionSnapshot {
    pub is_active: bool,
    pub remaining: Option<f64>,
}

impl SubscriptionSnapshot {
    pub fn eligible(&self) -> bool {
        self.is_active && self.remaining.map(|r| r > 0.0).unwrap_or(true)
    }
}

/// Outcome of evaluating a subscription payload for a free appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaEvaluation {
    pub eligible: bool,
    pub remaining: Option<f64>,
}

impl QuotaEvaluation {
    pub fn not_eligible() -> Self {
        Self {
            eligible: false,
            remaining: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRequest {
    pub user_id: Uuid,
    pub service: String,
    pub appointment_id: Option<Uuid>,
    pub action: String,
    pub count: i32,
}

impl UsageRequest {
    pub fn consume_appointment(user_id: Uuid, appointment_id: Uuid) -> Self {
        Self {
            user_id,
            service: "appointment".to_string(),
            appointment_id: Some(appointment_id),
            action: "consume".to_string(),
            count: 1,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Subscription service error: {0}")]
    ServiceError(String),
}
