// libs/booking-cell/src/services/flow.rs
//
// The state machine proper. `reduce` is the only place BookingState is
// mutated; it is a pure function so every transition can be tested without
// services or a UI attached.

use tracing::warn;

use crate::models::{
    BookingAction, BookingFlow, BookingState, BookingStep, PaymentStatus, Prerequisite,
};

const DOCTOR_FLOW_STEPS: [BookingStep; 7] = [
    BookingStep::Doctor,
    BookingStep::Clinic,
    BookingStep::Date,
    BookingStep::Details,
    BookingStep::Review,
    BookingStep::Payment,
    BookingStep::Confirmation,
];

const CLINIC_FLOW_STEPS: [BookingStep; 7] = [
    BookingStep::Clinic,
    BookingStep::ClinicDoctor,
    BookingStep::Date,
    BookingStep::Details,
    BookingStep::Review,
    BookingStep::Payment,
    BookingStep::Confirmation,
];

pub fn step_sequence(flow: BookingFlow) -> &'static [BookingStep] {
    match flow {
        BookingFlow::Doctor => &DOCTOR_FLOW_STEPS,
        BookingFlow::Clinic => &CLINIC_FLOW_STEPS,
    }
}

pub fn initial_step(flow: BookingFlow) -> BookingStep {
    step_sequence(flow)[0]
}

pub fn step_valid_for_flow(flow: BookingFlow, step: BookingStep) -> bool {
    step_sequence(flow).contains(&step)
}

/// Index of a step within its flow. `Slot` is a rendering sub-state of the
/// date step and navigates as `Date`; `Selection` sits before the sequence.
fn step_position(flow: BookingFlow, step: BookingStep) -> Option<usize> {
    let step = if step == BookingStep::Slot {
        BookingStep::Date
    } else {
        step
    };
    step_sequence(flow).iter().position(|s| *s == step)
}

pub fn payment_transition_allowed(from: Option<PaymentStatus>, to: PaymentStatus) -> bool {
    matches!(
        (from, to),
        (None, PaymentStatus::Pending)
            | (Some(PaymentStatus::Pending), PaymentStatus::Processing)
            | (Some(PaymentStatus::Processing), PaymentStatus::Success)
            | (Some(PaymentStatus::Processing), PaymentStatus::Failed)
            | (Some(PaymentStatus::Failed), PaymentStatus::Pending)
    )
}

pub fn reduce(state: &BookingState, action: BookingAction) -> BookingState {
    let mut next = state.clone();

    match action {
        BookingAction::SetBookingFlow(flow) => {
            // Selections made under one ordering are meaningless in the other.
            next.booking_flow = flow;
            next.current_step = initial_step(flow);
            next.selected_doctor = None;
            next.selected_clinic = None;
            next.selected_date = None;
            next.selected_slot = None;
            next.booking_details = None;
            next.time_slots.clear();
        }
        BookingAction::SelectDoctor(doctor) => {
            next.selected_doctor = Some(doctor);
            clear_derived_selections(&mut next);
        }
        BookingAction::SelectClinic(clinic) => {
            next.selected_clinic = Some(clinic);
            clear_derived_selections(&mut next);
        }
        BookingAction::SelectDate(date) => {
            next.selected_date = Some(date);
            next.selected_slot = None;
            // Emptied before any fetch resolves so a previous date's slots
            // are never rendered against the new one.
            next.time_slots.clear();
        }
        BookingAction::SlotsLoaded { date, slots } => {
            if next.selected_date == Some(date) {
                next.time_slots = slots;
            } else {
                warn!("Dropping slot response for {}: date is no longer selected", date);
            }
        }
        BookingAction::SelectSlot(slot) => {
            next.selected_slot = Some(slot);
        }
        BookingAction::SetBookingDetails(details) => match details.validate() {
            Ok(()) => next.booking_details = Some(details),
            Err(e) => warn!("Rejecting incomplete booking details: {}", e),
        },
        BookingAction::SetPaymentMethod(method) => {
            next.payment_method = Some(method);
        }
        BookingAction::PaymentStatusChanged(status) => {
            if payment_transition_allowed(next.payment_status, status) {
                next.payment_status = Some(status);
            } else {
                warn!(
                    "Ignoring payment status transition {:?} -> {:?}",
                    next.payment_status, status
                );
            }
        }
        BookingAction::GoNext => {
            let sequence = step_sequence(next.booking_flow);
            match step_position(next.booking_flow, next.current_step) {
                Some(index) if index + 1 < sequence.len() => {
                    next.current_step = sequence[index + 1];
                }
                Some(_) => {} // Confirmation is terminal; only a reset leaves it.
                None => next.current_step = initial_step(next.booking_flow),
            }
        }
        BookingAction::GoBack => {
            // In the clinic-first ordering the doctor pick is re-entered
            // through the clinic's doctor list, so stepping back from the
            // date lands on the clinic itself.
            if next.booking_flow == BookingFlow::Clinic
                && next.current_step == BookingStep::Date
            {
                next.current_step = BookingStep::Clinic;
            } else if let Some(index) = step_position(next.booking_flow, next.current_step) {
                if index > 0 {
                    next.current_step = step_sequence(next.booking_flow)[index - 1];
                }
            }
        }
        BookingAction::GoToStep(step) => {
            if step_valid_for_flow(next.booking_flow, step) {
                next.current_step = step;
            } else {
                warn!(
                    "Step {} is not part of the {:?} flow",
                    step, next.booking_flow
                );
            }
        }
        BookingAction::BeginProcessing => next.is_processing = true,
        BookingAction::FinishProcessing => next.is_processing = false,
        BookingAction::ResetBooking => next = BookingState::default(),
    }

    next
}

fn clear_derived_selections(state: &mut BookingState) {
    state.selected_date = None;
    state.selected_slot = None;
    state.time_slots.clear();
}

/// Everything that still has to happen before a review can be shown,
/// in the order the user should resolve it.
pub fn missing_prerequisites(state: &BookingState) -> Vec<Prerequisite> {
    let mut missing = Vec::new();

    if state.selected_doctor.is_none() {
        missing.push(Prerequisite::Doctor);
    }
    if state.selected_clinic.is_none() {
        missing.push(Prerequisite::Clinic);
    }
    if state.selected_date.is_none() || state.selected_slot.is_none() {
        missing.push(Prerequisite::DateAndSlot);
    }
    if state.booking_details.is_none() {
        missing.push(Prerequisite::Details);
    }

    missing
}

pub fn first_missing_step(state: &BookingState) -> Option<BookingStep> {
    missing_prerequisites(state)
        .first()
        .map(|prerequisite| prerequisite.target_step(state.booking_flow))
}
