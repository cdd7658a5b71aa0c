// libs/booking-cell/src/services/reschedule.rs
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use directory_cell::models::Clinic;
use directory_cell::services::DirectoryService;
use schedule_cell::models::{ScheduleError, TimeSlot};
use schedule_cell::services::{AvailabilityResolver, ConflictGuard};
use shared_api::ApiClient;
use shared_models::SessionTokens;

use crate::models::{AppointmentRecord, BookingError};

/// Moves an existing appointment to a new date/slot/clinic. Shares the
/// resolver and guard with the primary flow but ends in a caller-supplied
/// confirmation instead of a payment step.
pub struct RescheduleSession {
    tokens: SessionTokens,
    appointment: AppointmentRecord,
    clinics: Vec<Clinic>,
    selected_clinic: Clinic,
    selected_date: Option<NaiveDate>,
    selected_slot: Option<TimeSlot>,
    time_slots: Vec<TimeSlot>,
    is_processing: bool,
    resolver: AvailabilityResolver,
    guard: ConflictGuard,
}

impl RescheduleSession {
    /// The clinic starts out as the appointment's own; when the doctor
    /// practices at several clinics the full list becomes selectable.
    pub async fn start(
        api: Arc<ApiClient>,
        tokens: SessionTokens,
        directory: &DirectoryService,
        appointment: AppointmentRecord,
        current_clinic: Clinic,
    ) -> Self {
        let mut clinics = match directory
            .get_clinics_by_doctor(appointment.doctor_id, &tokens.access_token)
            .await
        {
            Ok(clinics) => clinics,
            Err(e) => {
                warn!("Clinic list unavailable, offering only the current one: {}", e);
                Vec::new()
            }
        };

        if !clinics.iter().any(|c| c.id == current_clinic.id) {
            clinics.insert(0, current_clinic.clone());
        }

        Self {
            tokens,
            appointment,
            clinics,
            selected_clinic: current_clinic,
            selected_date: None,
            selected_slot: None,
            time_slots: Vec::new(),
            is_processing: false,
            resolver: AvailabilityResolver::new(Arc::clone(&api)),
            guard: ConflictGuard::new(api),
        }
    }

    pub fn clinics(&self) -> &[Clinic] {
        &self.clinics
    }

    pub fn selected_clinic(&self) -> &Clinic {
        &self.selected_clinic
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn selected_slot(&self) -> Option<&TimeSlot> {
        self.selected_slot.as_ref()
    }

    pub fn time_slots(&self) -> &[TimeSlot] {
        &self.time_slots
    }

    /// Switching clinic invalidates the date and slot picked under the
    /// previous one, exactly as in the primary flow.
    pub fn select_clinic(&mut self, clinic: Clinic) {
        if clinic.id != self.selected_clinic.id {
            self.selected_date = None;
            self.selected_slot = None;
            self.time_slots.clear();
        }
        self.selected_clinic = clinic;
    }

    pub async fn bookable_dates(
        &self,
        month: u32,
        year: i32,
    ) -> std::collections::BTreeSet<NaiveDate> {
        self.resolver
            .get_bookable_dates(
                self.appointment.doctor_id,
                &self.selected_clinic.id,
                month,
                year,
                &self.tokens.access_token,
            )
            .await
    }

    pub async fn select_date(
        &mut self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        self.selected_date = Some(date);
        self.selected_slot = None;
        self.time_slots.clear();

        let result = self
            .resolver
            .get_slots_for_date(
                self.appointment.doctor_id,
                &self.selected_clinic.id,
                date,
                now,
                &self.tokens.access_token,
            )
            .await;

        // The user may have clicked another date while this fetch was out.
        if self.selected_date != Some(date) {
            warn!("Dropping slot response for {}: date is no longer selected", date);
            return Ok(());
        }

        match result {
            Ok(slots) => {
                self.time_slots = slots;
                Ok(())
            }
            Err(ScheduleError::MissingClinic) => Err(BookingError::MissingClinic),
            Err(e) => Err(BookingError::ServiceError(e.to_string())),
        }
    }

    pub fn select_slot(&mut self, slot: TimeSlot) -> Result<(), BookingError> {
        if self.selected_date.is_none() {
            return Err(BookingError::MissingDate);
        }
        if !slot.available {
            return Err(BookingError::SlotUnavailable);
        }
        self.selected_slot = Some(slot);
        Ok(())
    }

    /// Hand the new (date, slot, clinic) triple to the caller's confirmation.
    /// A triple identical to the current appointment is rejected before
    /// anything leaves the client.
    pub async fn submit<F, Fut>(
        &mut self,
        now: DateTime<Utc>,
        confirm: F,
    ) -> Result<(), BookingError>
    where
        F: FnOnce(NaiveDate, TimeSlot, Clinic) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        if self.is_processing {
            return Err(BookingError::ProcessingInFlight);
        }

        let date = self.selected_date.ok_or(BookingError::MissingDate)?;
        let slot = self.selected_slot.clone().ok_or(BookingError::MissingSlot)?;
        let clinic = self.selected_clinic.clone();

        let unchanged = date == self.appointment.date
            && slot.start_time == self.appointment.start_time
            && clinic.id == self.appointment.clinic_id;
        if unchanged {
            return Err(BookingError::UnchangedReschedule);
        }

        let time_str = slot.start_time.format("%H:%M").to_string();
        if ConflictGuard::is_past_selection(date, &time_str, now) {
            return Err(BookingError::PastSelection);
        }

        self.is_processing = true;
        let result = self.run_submit(date, slot, clinic, confirm).await;
        self.is_processing = false;
        result
    }

    async fn run_submit<F, Fut>(
        &self,
        date: NaiveDate,
        slot: TimeSlot,
        clinic: Clinic,
        confirm: F,
    ) -> Result<(), BookingError>
    where
        F: FnOnce(NaiveDate, TimeSlot, Clinic) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        match self
            .guard
            .has_existing_booking(
                self.tokens.user_id,
                self.appointment.doctor_id,
                &clinic.id,
                date,
                &slot.range(),
                &self.tokens.access_token,
            )
            .await
        {
            Ok(true) => return Err(BookingError::AlreadyBooked),
            Ok(false) => {}
            Err(e) => return Err(BookingError::ConflictCheckFailed(e.to_string())),
        }

        confirm(date, slot, clinic)
            .await
            .map_err(|e| BookingError::ServiceError(e.to_string()))?;

        info!("Appointment {} rescheduled to {}", self.appointment.id, date);
        Ok(())
    }
}
