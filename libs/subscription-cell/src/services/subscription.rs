use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_api::ApiClient;

use crate::models::{QuotaEvaluation, SubscriptionError, UsageRequest};
use crate::services::quota;

pub struct SubscriptionService {
    api: Arc<ApiClient>,
}

impl SubscriptionService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Raw active-subscription payload for a user. Callers should not
    /// assume any particular shape; run it through `quota::evaluate`.
    pub async fn get_active_subscription(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Value, SubscriptionError> {
        debug!("Fetching active subscription for user {}", user_id);

        let path = format!("/api/v1/subscriptions/active?user_id={}", user_id);
        self.api
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SubscriptionError::ServiceError(e.to_string()))
    }

    /// Fetch and evaluate in one step. A service failure means no discount,
    /// never a blocked booking.
    pub async fn evaluate_active_subscription(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> QuotaEvaluation {
        match self.get_active_subscription(user_id, auth_token).await {
            Ok(payload) => quota::evaluate(&payload),
            Err(e) => {
                warn!("Subscription lookup failed, treating as not eligible: {}", e);
                QuotaEvaluation::not_eligible()
            }
        }
    }

    /// Report quota usage after a covered booking. Fire-and-forget: a failed
    /// decrement is logged and the confirmation proceeds regardless.
    pub async fn record_usage(&self, request: UsageRequest, auth_token: &str) {
        let body = match serde_json::to_value(&request) {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not encode usage request: {}", e);
                return;
            }
        };

        let result: Result<Value, _> = self
            .api
            .request(
                Method::POST,
                "/api/v1/subscriptions/usage",
                Some(auth_token),
                Some(body),
            )
            .await;

        if let Err(e) = result {
            warn!(
                "Usage decrement failed for user {} ({}); continuing",
                request.user_id, e
            );
        }
    }
}
