// libs/booking-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use directory_cell::models::{Clinic, Doctor};
use schedule_cell::models::TimeSlot;

// ==============================================================================
// FLOW AND STEPS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingFlow {
    Doctor,
    Clinic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStep {
    Selection,
    Doctor,
    Clinic,
    ClinicDoctor,
    Date,
    Slot,
    Details,
    Review,
    Payment,
    Confirmation,
}

impl BookingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStep::Selection => "selection",
            BookingStep::Doctor => "doctor",
            BookingStep::Clinic => "clinic",
            BookingStep::ClinicDoctor => "clinic-doctor",
            BookingStep::Date => "date",
            BookingStep::Slot => "slot",
            BookingStep::Details => "details",
            BookingStep::Review => "review",
            BookingStep::Payment => "payment",
            BookingStep::Confirmation => "confirmation",
        }
    }
}

impl fmt::Display for BookingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==============================================================================
// PATIENT DETAILS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatientType {
    #[serde(rename = "self")]
    SelfPatient,
    Family,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDetails {
    pub patient_type: PatientType,
    pub patient_name: Option<String>,
    pub patient_age: Option<u8>,
    pub patient_gender: Option<String>,
}

impl BookingDetails {
    pub fn for_self() -> Self {
        Self {
            patient_type: PatientType::SelfPatient,
            patient_name: None,
            patient_age: None,
            patient_gender: None,
        }
    }

    pub fn for_family_member(name: &str, age: u8, gender: &str) -> Self {
        Self {
            patient_type: PatientType::Family,
            patient_name: Some(name.to_string()),
            patient_age: Some(age),
            patient_gender: Some(gender.to_string()),
        }
    }

    /// Family bookings must identify the family member; a booking for the
    /// account holder needs nothing further.
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.patient_type == PatientType::SelfPatient {
            return Ok(());
        }

        if self.patient_name.as_deref().map_or(true, str::is_empty) {
            return Err(BookingError::IncompleteDetails("patient_name".to_string()));
        }
        if self.patient_age.is_none() {
            return Err(BookingError::IncompleteDetails("patient_age".to_string()));
        }
        if self.patient_gender.as_deref().map_or(true, str::is_empty) {
            return Err(BookingError::IncompleteDetails("patient_gender".to_string()));
        }

        Ok(())
    }
}

// ==============================================================================
// PAYMENT
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Wallet,
    BankTransfer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

/// What the review step shows before the user commits to paying.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewSummary {
    pub consultation_fee: f64,
    pub covered_by_subscription: bool,
    pub discount: f64,
    pub amount_due: f64,
    pub remaining_quota: Option<f64>,
}

// ==============================================================================
// BOOKING STATE
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingState {
    pub booking_flow: BookingFlow,
    pub current_step: BookingStep,
    pub selected_doctor: Option<Doctor>,
    pub selected_clinic: Option<Clinic>,
    pub selected_date: Option<NaiveDate>,
    pub selected_slot: Option<TimeSlot>,
    pub time_slots: Vec<TimeSlot>,
    pub booking_details: Option<BookingDetails>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
    pub is_processing: bool,
}

impl Default for BookingState {
    fn default() -> Self {
        Self {
            booking_flow: BookingFlow::Doctor,
            current_step: BookingStep::Doctor,
            selected_doctor: None,
            selected_clinic: None,
            selected_date: None,
            selected_slot: None,
            time_slots: Vec::new(),
            booking_details: None,
            payment_method: None,
            payment_status: None,
            is_processing: false,
        }
    }
}

/// Every mutation of BookingState goes through one of these.
#[derive(Debug, Clone)]
pub enum BookingAction {
    SetBookingFlow(BookingFlow),
    SelectDoctor(Doctor),
    SelectClinic(Clinic),
    SelectDate(NaiveDate),
    SlotsLoaded {
        date: NaiveDate,
        slots: Vec<TimeSlot>,
    },
    SelectSlot(TimeSlot),
    SetBookingDetails(BookingDetails),
    SetPaymentMethod(PaymentMethod),
    PaymentStatusChanged(PaymentStatus),
    GoNext,
    GoBack,
    GoToStep(BookingStep),
    BeginProcessing,
    FinishProcessing,
    ResetBooking,
}

// ==============================================================================
// PREREQUISITES
// ==============================================================================

/// Checklist entry for a step whose upstream selections are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    Doctor,
    Clinic,
    DateAndSlot,
    Details,
}

impl Prerequisite {
    pub fn label(&self) -> &'static str {
        match self {
            Prerequisite::Doctor => "Choose a doctor",
            Prerequisite::Clinic => "Choose a clinic",
            Prerequisite::DateAndSlot => "Pick a date and time slot",
            Prerequisite::Details => "Fill in patient details",
        }
    }

    /// The step that resolves this prerequisite in the given flow.
    pub fn target_step(&self, flow: BookingFlow) -> BookingStep {
        match self {
            Prerequisite::Doctor => match flow {
                BookingFlow::Doctor => BookingStep::Doctor,
                BookingFlow::Clinic => BookingStep::ClinicDoctor,
            },
            Prerequisite::Clinic => BookingStep::Clinic,
            Prerequisite::DateAndSlot => BookingStep::Date,
            Prerequisite::Details => BookingStep::Details,
        }
    }
}

// ==============================================================================
// APPOINTMENT RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRecord {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: String,
    pub date: NaiveDate,
    #[serde(alias = "from")]
    pub start_time: NaiveTime,
    #[serde(alias = "to")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookAppointmentRequest {
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub details: BookingDetails,
    pub payment_id: Option<String>,
    pub covered_by_subscription: bool,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("A doctor must be selected first")]
    MissingDoctor,

    #[error("A clinic must be selected first")]
    MissingClinic,

    #[error("A date must be selected first")]
    MissingDate,

    #[error("A time slot must be selected first")]
    MissingSlot,

    #[error("Patient details are required before continuing")]
    MissingDetails,

    #[error("Patient details are incomplete: {0} is required")]
    IncompleteDetails(String),

    #[error("That time has already passed. Please pick another slot")]
    PastSelection,

    #[error("This slot is no longer available")]
    SlotUnavailable,

    #[error("You already have a booking at this time")]
    AlreadyBooked,

    #[error("Could not verify the slot, please try again: {0}")]
    ConflictCheckFailed(String),

    #[error("Another request is still being processed")]
    ProcessingInFlight,

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Pick a different date, slot or clinic to reschedule")]
    UnchangedReschedule,

    #[error("{0}")]
    ServiceError(String),
}

impl BookingError {
    /// Wrap a booking-submission failure, keeping the server's own words
    /// when it sent any.
    pub fn from_server_message(message: &str) -> Self {
        if message.trim().is_empty() {
            BookingError::ServiceError(
                "The booking could not be completed. Please try again".to_string(),
            )
        } else {
            BookingError::ServiceError(message.to_string())
        }
    }
}
