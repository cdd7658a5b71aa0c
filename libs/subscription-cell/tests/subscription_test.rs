use std::sync::Arc;

use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_api::ApiClient;
use shared_utils::test_utils::{init_test_tracing, TestConfig};
use subscription_cell::models::UsageRequest;
use subscription_cell::services::SubscriptionService;

async fn setup() -> (MockServer, SubscriptionService) {
    init_test_tracing();
    let server = MockServer::start().await;
    let config = TestConfig::with_base_url(&server.uri()).to_app_config();
    let service = SubscriptionService::new(Arc::new(ApiClient::new(&config)));
    (server, service)
}

#[tokio::test]
async fn evaluates_a_wrapped_subscription_payload() {
    let (server, service) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/subscriptions/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"subscription": {"isActive": true, "remainingFreeAppointments": 3}}
        })))
        .mount(&server)
        .await;

    let evaluation = service
        .evaluate_active_subscription(Uuid::new_v4(), "token")
        .await;
    assert!(evaluation.eligible);
    assert_eq!(evaluation.remaining, Some(3.0));
}

#[tokio::test]
async fn lookup_failure_means_not_eligible() {
    let (server, service) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/subscriptions/active"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let evaluation = service
        .evaluate_active_subscription(Uuid::new_v4(), "token")
        .await;
    assert!(!evaluation.eligible);
}

#[tokio::test]
async fn usage_decrement_failure_does_not_propagate() {
    let (server, service) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/subscriptions/usage"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    // Returns unit either way; the call must simply not panic or hang.
    service
        .record_usage(
            UsageRequest::consume_appointment(Uuid::new_v4(), Uuid::new_v4()),
            "token",
        )
        .await;
}

#[tokio::test]
async fn usage_decrement_posts_the_request() {
    let (server, service) = setup().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/api/v1/subscriptions/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    service
        .record_usage(
            UsageRequest::consume_appointment(user_id, Uuid::new_v4()),
            "token",
        )
        .await;
}
