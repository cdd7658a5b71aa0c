use std::sync::Once;

use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

static TRACING: Once = Once::new();

/// Install a test subscriber once per process. Later calls are no-ops.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub struct TestConfig {
    pub api_base_url: String,
    pub api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:9090".to_string(),
            api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            api_base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.api_base_url.clone(),
            api_key: self.api_key.clone(),
            payment_currency: "EUR".to_string(),
        }
    }
}

pub fn doctor_json(id: Uuid, name: &str, fee: f64) -> Value {
    json!({
        "id": id,
        "fullName": name,
        "specialty": "General Medicine",
        "consultationFee": fee
    })
}

pub fn clinic_json(id: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "address": "12 Harbour Street"
    })
}

/// A raw slot the way the scheduling backend reports it.
pub fn raw_slot_json(from: &str, to: &str, limit: i64, available: i64) -> Value {
    json!({
        "from": from,
        "to": to,
        "appointmentLimit": limit,
        "availableSlots": available,
        "isAvailable": available > 0
    })
}
