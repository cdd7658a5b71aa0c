use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::models::{
    BookingDetails, BookingError, BookingStep, PaymentMethod, PaymentStatus,
};
use booking_cell::services::{BookingSession, PaymentGateway, PaymentPrefill, PurchaseReceipt};
use directory_cell::models::{Clinic, Doctor};
use shared_api::ApiClient;
use shared_models::SessionTokens;
use shared_utils::test_utils::{init_test_tracing, raw_slot_json, TestConfig};

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

struct CountingGateway {
    calls: AtomicUsize,
    approve: bool,
}

impl CountingGateway {
    fn approving() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            approve: true,
        }
    }

    fn declining() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            approve: false,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for CountingGateway {
    async fn purchase(
        &self,
        _method: PaymentMethod,
        _amount: f64,
        _prefill: PaymentPrefill,
    ) -> anyhow::Result<PurchaseReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PurchaseReceipt {
            success: self.approve,
            payment_id: self.approve.then(|| "pay-123".to_string()),
            message: (!self.approve).then(|| "Card declined".to_string()),
        })
    }
}

struct TestSetup {
    server: MockServer,
    session: BookingSession,
    doctor: Doctor,
    clinic: Clinic,
}

impl TestSetup {
    async fn new() -> Self {
        init_test_tracing();
        let server = MockServer::start().await;
        let config = TestConfig::with_base_url(&server.uri()).to_app_config();
        let api = Arc::new(ApiClient::new(&config));

        let session = BookingSession::new(
            api,
            SessionTokens {
                user_id: Uuid::new_v4(),
                access_token: "test-token".to_string(),
            },
        );

        let doctor = Doctor {
            id: Uuid::new_v4(),
            full_name: "Ana Costa".to_string(),
            specialty: Some("General Medicine".to_string()),
            consultation_fee: 45.0,
        };
        let clinic = Clinic {
            id: "c-1".to_string(),
            name: "Harbour Clinic".to_string(),
            address: None,
        };

        Self {
            server,
            session,
            doctor,
            clinic,
        }
    }

    async fn mount_schedule_mocks(&self) {
        Mock::given(method("GET"))
            .and(path("/api/v1/appointments/monthly"))
            .and(query_param("month", "3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!(["2025-03-10"])),
            )
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/appointments/monthly"))
            .and(query_param("month", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/appointments/slots"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(vec![raw_slot_json("09:00", "09:30", 4, 1)]),
            )
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/appointments/check"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"exists": false})),
            )
            .mount(&self.server)
            .await;
    }

    async fn mount_subscription(&self, payload: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/v1/subscriptions/active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload))
            .mount(&self.server)
            .await;
    }

    async fn mount_booking_created(&self) {
        let record = serde_json::json!({
            "id": Uuid::new_v4(),
            "doctor_id": self.doctor.id,
            "clinic_id": self.clinic.id,
            "date": "2025-03-10",
            "start_time": "09:00:00",
            "end_time": "09:30:00",
            "status": "pending"
        });

        Mock::given(method("POST"))
            .and(path("/api/v1/appointments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record))
            .mount(&self.server)
            .await;
    }

    /// Drive the doctor flow up to and including slot confirmation.
    async fn advance_to_details(&mut self) {
        let now = test_now();
        let booking_date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        self.session.select_doctor(self.doctor.clone());
        self.session.go_next();
        self.session.select_clinic(self.clinic.clone());
        self.session.go_next();
        assert_eq!(self.session.state().current_step, BookingStep::Date);

        let dates = self.session.bookable_dates(3, 2025).await.unwrap();
        assert!(dates.contains(&booking_date));

        self.session.select_date(booking_date, now).await.unwrap();
        let slot = self.session.state().time_slots[0].clone();
        assert_eq!(slot.booked_count, 3);
        assert_eq!(slot.max_bookings, 4);
        assert!(slot.available);

        self.session.confirm_slot(slot, now).await.unwrap();
        assert_eq!(self.session.state().current_step, BookingStep::Details);
    }
}

fn test_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

// ==============================================================================
// SCENARIOS
// ==============================================================================

#[tokio::test]
async fn full_doctor_flow_through_payment_to_confirmation() {
    let mut setup = TestSetup::new().await;
    setup.mount_schedule_mocks().await;
    setup.mount_subscription(serde_json::json!({})).await;
    setup.mount_booking_created().await;

    setup.advance_to_details().await;

    setup
        .session
        .submit_details(BookingDetails::for_self())
        .unwrap();
    assert_eq!(setup.session.state().current_step, BookingStep::Review);

    let summary = setup.session.review_summary().await.unwrap();
    assert!(!summary.covered_by_subscription);
    assert_eq!(summary.consultation_fee, 45.0);
    assert_eq!(summary.amount_due, 45.0);

    let gateway = CountingGateway::approving();
    let record = setup
        .session
        .confirm_payment(&gateway, PaymentMethod::Card, test_now())
        .await
        .unwrap();

    assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    assert_eq!(gateway.call_count(), 1);
    assert_eq!(setup.session.state().current_step, BookingStep::Confirmation);
    assert_eq!(
        setup.session.state().payment_status,
        Some(PaymentStatus::Success)
    );
    assert!(!setup.session.state().is_processing);
}

#[tokio::test]
async fn subscription_quota_makes_the_booking_free() {
    let mut setup = TestSetup::new().await;
    setup.mount_schedule_mocks().await;
    setup
        .mount_subscription(serde_json::json!({
            "isActive": true,
            "remainingFreeAppointments": 2
        }))
        .await;
    setup.mount_booking_created().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/subscriptions/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&setup.server)
        .await;

    setup.advance_to_details().await;
    setup
        .session
        .submit_details(BookingDetails::for_family_member("Maya Costa", 9, "female"))
        .unwrap();

    let summary = setup.session.review_summary().await.unwrap();
    assert!(summary.covered_by_subscription);
    assert_eq!(summary.discount, 45.0);
    assert_eq!(summary.amount_due, 0.0);
    assert_eq!(summary.remaining_quota, Some(2.0));

    let gateway = CountingGateway::approving();
    setup
        .session
        .confirm_payment(&gateway, PaymentMethod::Card, test_now())
        .await
        .unwrap();

    assert_eq!(gateway.call_count(), 0, "a covered booking must not charge");
    assert_eq!(setup.session.state().current_step, BookingStep::Confirmation);
}

#[tokio::test]
async fn a_declined_payment_keeps_the_flow_recoverable() {
    let mut setup = TestSetup::new().await;
    setup.mount_schedule_mocks().await;
    setup.mount_subscription(serde_json::json!({})).await;

    setup.advance_to_details().await;
    setup
        .session
        .submit_details(BookingDetails::for_self())
        .unwrap();

    let gateway = CountingGateway::declining();
    let err = setup
        .session
        .confirm_payment(&gateway, PaymentMethod::Card, test_now())
        .await
        .unwrap_err();

    match err {
        BookingError::PaymentFailed(message) => assert_eq!(message, "Card declined"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        setup.session.state().payment_status,
        Some(PaymentStatus::Failed)
    );
    assert!(!setup.session.state().is_processing);
    assert_ne!(setup.session.state().current_step, BookingStep::Confirmation);
}

#[tokio::test]
async fn an_existing_booking_blocks_the_slot() {
    let setup = TestSetup::new().await;
    let mut session = setup.session;
    let now = test_now();

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/slots"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(vec![raw_slot_json("09:00", "09:30", 4, 2)]),
        )
        .mount(&setup.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"exists": true})))
        .mount(&setup.server)
        .await;

    session.select_doctor(setup.doctor.clone());
    session.select_clinic(setup.clinic.clone());
    session
        .select_date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), now)
        .await
        .unwrap();

    let slot = session.state().time_slots[0].clone();
    let err = session.confirm_slot(slot, now).await.unwrap_err();
    assert_matches!(err, BookingError::AlreadyBooked);
    assert!(session.state().selected_slot.is_none());
}

#[tokio::test]
async fn a_failed_conflict_check_blocks_instead_of_waving_through() {
    let setup = TestSetup::new().await;
    let mut session = setup.session;
    let now = test_now();

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/slots"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(vec![raw_slot_json("09:00", "09:30", 4, 2)]),
        )
        .mount(&setup.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/check"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&setup.server)
        .await;

    session.select_doctor(setup.doctor.clone());
    session.select_clinic(setup.clinic.clone());
    session
        .select_date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), now)
        .await
        .unwrap();

    let slot = session.state().time_slots[0].clone();
    let err = session.confirm_slot(slot, now).await.unwrap_err();
    assert_matches!(err, BookingError::ConflictCheckFailed(_));
}

#[tokio::test]
async fn a_slot_fetch_failure_leaves_an_empty_list_and_a_warning() {
    let setup = TestSetup::new().await;
    let mut session = setup.session;

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/slots"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&setup.server)
        .await;

    session.select_doctor(setup.doctor.clone());
    session.select_clinic(setup.clinic.clone());

    let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let err = session.select_date(date, test_now()).await.unwrap_err();

    assert_matches!(err, BookingError::ServiceError(_));
    assert_eq!(session.state().selected_date, Some(date));
    assert!(session.state().time_slots.is_empty());
}

#[tokio::test]
async fn a_rejected_booking_surfaces_the_server_message_verbatim() {
    let mut setup = TestSetup::new().await;
    setup.mount_schedule_mocks().await;
    setup.mount_subscription(serde_json::json!({})).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_string("Slot was taken a moment ago"))
        .mount(&setup.server)
        .await;

    setup.advance_to_details().await;
    setup
        .session
        .submit_details(BookingDetails::for_self())
        .unwrap();

    let gateway = CountingGateway::approving();
    let err = setup
        .session
        .confirm_payment(&gateway, PaymentMethod::Card, test_now())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Slot was taken a moment ago");
    assert_eq!(
        setup.session.state().payment_status,
        Some(PaymentStatus::Failed)
    );
}
