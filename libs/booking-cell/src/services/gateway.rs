use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PaymentMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPrefill {
    pub user_id: Uuid,
    pub patient_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub success: bool,
    pub payment_id: Option<String>,
    pub message: Option<String>,
}

/// Opaque seam to whichever payment SDK the host application ships.
/// This core only decides whether a payment is needed and for how much.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn purchase(
        &self,
        method: PaymentMethod,
        amount: f64,
        prefill: PaymentPrefill,
    ) -> anyhow::Result<PurchaseReceipt>;
}
