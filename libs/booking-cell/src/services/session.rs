// libs/booking-cell/src/services/session.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use schedule_cell::models::{ScheduleError, TimeSlot};
use schedule_cell::services::{AvailabilityResolver, ConflictGuard};
use shared_api::ApiClient;
use shared_models::{SessionTokens, TokenStore};
use subscription_cell::models::UsageRequest;
use subscription_cell::services::SubscriptionService;

use directory_cell::models::{Clinic, Doctor};

use crate::models::{
    BookAppointmentRequest, AppointmentRecord, BookingAction, BookingDetails, BookingError,
    BookingFlow, BookingState, BookingStep, PaymentMethod, PaymentStatus, Prerequisite,
    ReviewSummary,
};
use crate::services::appointments::AppointmentClient;
use crate::services::flow;
use crate::services::gateway::{PaymentGateway, PaymentPrefill};

/// One patient's active booking flow. Owns the state and drives it through
/// the resolver, guard, quota evaluator and appointment service; the UI
/// renders `state()` and calls back in.
pub struct BookingSession {
    state: BookingState,
    tokens: SessionTokens,
    resolver: AvailabilityResolver,
    guard: ConflictGuard,
    subscriptions: SubscriptionService,
    appointments: AppointmentClient,
}

impl BookingSession {
    pub fn new(api: Arc<ApiClient>, tokens: SessionTokens) -> Self {
        Self {
            state: BookingState::default(),
            tokens,
            resolver: AvailabilityResolver::new(Arc::clone(&api)),
            guard: ConflictGuard::new(Arc::clone(&api)),
            subscriptions: SubscriptionService::new(Arc::clone(&api)),
            appointments: AppointmentClient::new(api),
        }
    }

    /// None when the host has no signed-in session to read.
    pub fn from_token_store(api: Arc<ApiClient>, store: &dyn TokenStore) -> Option<Self> {
        store.get_tokens().map(|tokens| Self::new(api, tokens))
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn dispatch(&mut self, action: BookingAction) {
        self.state = flow::reduce(&self.state, action);
    }

    pub fn set_flow(&mut self, booking_flow: BookingFlow) {
        self.dispatch(BookingAction::SetBookingFlow(booking_flow));
    }

    pub fn select_doctor(&mut self, doctor: Doctor) {
        self.dispatch(BookingAction::SelectDoctor(doctor));
    }

    pub fn select_clinic(&mut self, clinic: Clinic) {
        self.dispatch(BookingAction::SelectClinic(clinic));
    }

    pub fn go_next(&mut self) {
        self.dispatch(BookingAction::GoNext);
    }

    pub fn go_back(&mut self) {
        self.dispatch(BookingAction::GoBack);
    }

    pub fn reset(&mut self) {
        self.dispatch(BookingAction::ResetBooking);
    }

    pub fn missing_prerequisites(&self) -> Vec<Prerequisite> {
        flow::missing_prerequisites(&self.state)
    }

    /// Jump straight to the first unresolved step, if any.
    pub fn jump_to_first_missing(&mut self) -> Option<BookingStep> {
        let step = flow::first_missing_step(&self.state)?;
        self.dispatch(BookingAction::GoToStep(step));
        Some(step)
    }

    /// Calendar dates with at least one bookable slot, for the month shown
    /// and the one after it.
    pub async fn bookable_dates(
        &self,
        month: u32,
        year: i32,
    ) -> Result<BTreeSet<NaiveDate>, BookingError> {
        let doctor = self
            .state
            .selected_doctor
            .as_ref()
            .ok_or(BookingError::MissingDoctor)?;
        let clinic = self
            .state
            .selected_clinic
            .as_ref()
            .ok_or(BookingError::MissingClinic)?;

        Ok(self
            .resolver
            .get_bookable_dates(doctor.id, &clinic.id, month, year, &self.tokens.access_token)
            .await)
    }

    /// Pick a date. The slot list empties synchronously, then refills once
    /// the fetch lands - unless the user has moved on to another date, in
    /// which case the late response is dropped by the reducer.
    pub async fn select_date(
        &mut self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let doctor = self
            .state
            .selected_doctor
            .clone()
            .ok_or(BookingError::MissingDoctor)?;
        let clinic = self
            .state
            .selected_clinic
            .clone()
            .ok_or(BookingError::MissingClinic)?;

        self.dispatch(BookingAction::SelectDate(date));

        let result = self
            .resolver
            .get_slots_for_date(doctor.id, &clinic.id, date, now, &self.tokens.access_token)
            .await;

        match result {
            Ok(slots) => {
                self.dispatch(BookingAction::SlotsLoaded { date, slots });
                Ok(())
            }
            Err(ScheduleError::MissingClinic) => Err(BookingError::MissingClinic),
            Err(e) => {
                warn!("Slot fetch failed for {}: {}", date, e);
                self.dispatch(BookingAction::SlotsLoaded {
                    date,
                    slots: Vec::new(),
                });
                Err(BookingError::ServiceError(e.to_string()))
            }
        }
    }

    /// The final gate before patient details: the slot must still be open,
    /// in the future, and not already held by this user.
    pub async fn confirm_slot(
        &mut self,
        slot: TimeSlot,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let doctor = self
            .state
            .selected_doctor
            .clone()
            .ok_or(BookingError::MissingDoctor)?;
        let clinic = self
            .state
            .selected_clinic
            .clone()
            .ok_or(BookingError::MissingClinic)?;
        let date = self.state.selected_date.ok_or(BookingError::MissingDate)?;

        if !slot.available {
            return Err(BookingError::SlotUnavailable);
        }

        let time_str = slot.start_time.format("%H:%M").to_string();
        if ConflictGuard::is_past_selection(date, &time_str, now) {
            return Err(BookingError::PastSelection);
        }

        let existing = self
            .guard
            .has_existing_booking(
                self.tokens.user_id,
                doctor.id,
                &clinic.id,
                date,
                &slot.range(),
                &self.tokens.access_token,
            )
            .await;

        match existing {
            Ok(true) => Err(BookingError::AlreadyBooked),
            Ok(false) => {
                self.dispatch(BookingAction::SelectSlot(slot));
                self.dispatch(BookingAction::GoNext);
                Ok(())
            }
            Err(e) => Err(BookingError::ConflictCheckFailed(e.to_string())),
        }
    }

    pub fn submit_details(&mut self, details: BookingDetails) -> Result<(), BookingError> {
        details.validate()?;
        self.dispatch(BookingAction::SetBookingDetails(details));
        self.dispatch(BookingAction::GoNext);
        Ok(())
    }

    /// What the review step shows: the consultation fee, less the
    /// subscription discount when the quota covers this appointment.
    pub async fn review_summary(&self) -> Result<ReviewSummary, BookingError> {
        if let Some(err) = self.prerequisite_error() {
            return Err(err);
        }

        let doctor = self
            .state
            .selected_doctor
            .as_ref()
            .ok_or(BookingError::MissingDoctor)?;

        let quota = self
            .subscriptions
            .evaluate_active_subscription(self.tokens.user_id, &self.tokens.access_token)
            .await;

        let fee = doctor.consultation_fee;
        let discount = if quota.eligible { fee } else { 0.0 };

        Ok(ReviewSummary {
            consultation_fee: fee,
            covered_by_subscription: quota.eligible,
            discount,
            amount_due: fee - discount,
            remaining_quota: quota.remaining,
        })
    }

    /// Run the checkout. Free when the subscription covers it, otherwise a
    /// gateway purchase precedes the booking. Guarded against double
    /// submission by the processing flag, not by debouncing.
    pub async fn confirm_payment(
        &mut self,
        gateway: &dyn PaymentGateway,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<AppointmentRecord, BookingError> {
        if self.state.is_processing {
            return Err(BookingError::ProcessingInFlight);
        }

        let doctor = self
            .state
            .selected_doctor
            .clone()
            .ok_or(BookingError::MissingDoctor)?;
        let clinic = self
            .state
            .selected_clinic
            .clone()
            .ok_or(BookingError::MissingClinic)?;
        let date = self.state.selected_date.ok_or(BookingError::MissingDate)?;
        let slot = self
            .state
            .selected_slot
            .clone()
            .ok_or(BookingError::MissingSlot)?;
        let details = self
            .state
            .booking_details
            .clone()
            .ok_or(BookingError::MissingDetails)?;

        let time_str = slot.start_time.format("%H:%M").to_string();
        if ConflictGuard::is_past_selection(date, &time_str, now) {
            return Err(BookingError::PastSelection);
        }

        self.dispatch(BookingAction::BeginProcessing);
        self.dispatch(BookingAction::SetPaymentMethod(method));
        self.dispatch(BookingAction::PaymentStatusChanged(PaymentStatus::Pending));
        self.dispatch(BookingAction::PaymentStatusChanged(PaymentStatus::Processing));

        let result = self
            .run_checkout(gateway, method, &doctor, &clinic, date, &slot, &details)
            .await;

        match result {
            Ok(record) => {
                self.dispatch(BookingAction::PaymentStatusChanged(PaymentStatus::Success));
                self.dispatch(BookingAction::GoToStep(BookingStep::Confirmation));
                self.dispatch(BookingAction::FinishProcessing);
                Ok(record)
            }
            Err(e) => {
                self.dispatch(BookingAction::PaymentStatusChanged(PaymentStatus::Failed));
                self.dispatch(BookingAction::FinishProcessing);
                Err(e)
            }
        }
    }

    fn prerequisite_error(&self) -> Option<BookingError> {
        flow::missing_prerequisites(&self.state)
            .first()
            .map(|prerequisite| match prerequisite {
                Prerequisite::Doctor => BookingError::MissingDoctor,
                Prerequisite::Clinic => BookingError::MissingClinic,
                Prerequisite::DateAndSlot => BookingError::MissingSlot,
                Prerequisite::Details => BookingError::MissingDetails,
            })
    }

    async fn run_checkout(
        &self,
        gateway: &dyn PaymentGateway,
        method: PaymentMethod,
        doctor: &Doctor,
        clinic: &Clinic,
        date: NaiveDate,
        slot: &TimeSlot,
        details: &BookingDetails,
    ) -> Result<AppointmentRecord, BookingError> {
        let user_id = self.tokens.user_id;
        let token = self.tokens.access_token.clone();

        let quota = self
            .subscriptions
            .evaluate_active_subscription(user_id, &token)
            .await;

        let mut request = BookAppointmentRequest {
            user_id,
            doctor_id: doctor.id,
            clinic_id: clinic.id.clone(),
            date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            details: details.clone(),
            payment_id: None,
            covered_by_subscription: quota.eligible,
        };

        if quota.eligible {
            info!("Booking covered by subscription for user {}", user_id);
            let record = self.appointments.book_appointment(&request, &token).await?;
            self.subscriptions
                .record_usage(UsageRequest::consume_appointment(user_id, record.id), &token)
                .await;
            return Ok(record);
        }

        let prefill = PaymentPrefill {
            user_id,
            patient_name: details.patient_name.clone(),
        };
        let receipt = gateway
            .purchase(method, doctor.consultation_fee, prefill)
            .await
            .map_err(|e| BookingError::PaymentFailed(e.to_string()))?;

        if !receipt.success {
            return Err(BookingError::PaymentFailed(
                receipt
                    .message
                    .unwrap_or_else(|| "The payment was not completed".to_string()),
            ));
        }

        request.payment_id = receipt.payment_id;
        self.appointments.book_appointment(&request, &token).await
    }
}
