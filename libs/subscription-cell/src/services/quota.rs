// libs/subscription-cell/src/services/quota.rs
//
// The subscription backend has gone through several payload shapes: a bare
// subscription object, a list of subscriptions, and one or two layers of
// envelope around either. Rather than chase each variant at the call sites,
// everything funnels through this one total evaluator.

use serde_json::Value;

use crate::models::{QuotaEvaluation, SubscriptionSnapshot};

const WRAPPER_KEYS: [&str; 3] = ["data", "subscription", "subscriptions"];

const ACTIVE_KEYS: [&str; 5] = [
    "isActive",
    "status",
    "is_active",
    "active",
    "subscriptionStatus",
];

const REMAINING_KEYS: [&str; 5] = [
    "remainingFreeAppointments",
    "remainingAppointments",
    "remainingBookings",
    "freeAppointmentsLeft",
    "freeAppointmentsRemaining",
];

const ACTIVE_STRINGS: [&str; 4] = ["true", "active", "yes", "enabled"];

/// Decide whether the subscription payload entitles the user to a free
/// appointment. Total over arbitrary input: malformed payloads are simply
/// not eligible.
pub fn evaluate(payload: &Value) -> QuotaEvaluation {
    let unwrapped = unwrap_payload(payload);

    let snapshot = match unwrapped {
        Value::Array(entries) => pick_from_entries(entries),
        Value::Object(_) => Some(snapshot_from_entry(unwrapped)),
        _ => None,
    };

    match snapshot {
        Some(snapshot) => QuotaEvaluation {
            eligible: snapshot.eligible(),
            remaining: snapshot.remaining,
        },
        None => QuotaEvaluation::not_eligible(),
    }
}

/// Strip up to two levels of known envelope keys.
fn unwrap_payload(payload: &Value) -> &Value {
    let mut current = payload;
    for _ in 0..2 {
        let Some(obj) = current.as_object() else { break };
        let Some(inner) = WRAPPER_KEYS.iter().find_map(|key| obj.get(*key)) else {
            break;
        };
        current = inner;
    }
    current
}

/// Among several entries, prefer one that is active and reports a numeric
/// remaining count; otherwise settle for any active entry.
fn pick_from_entries(entries: &[Value]) -> Option<SubscriptionSnapshot> {
    let snapshots: Vec<SubscriptionSnapshot> =
        entries.iter().map(snapshot_from_entry).collect();

    snapshots
        .iter()
        .find(|s| s.is_active && s.remaining.is_some())
        .or_else(|| snapshots.iter().find(|s| s.is_active))
        .cloned()
}

fn snapshot_from_entry(entry: &Value) -> SubscriptionSnapshot {
    SubscriptionSnapshot {
        is_active: ACTIVE_KEYS
            .iter()
            .filter_map(|key| entry.get(*key))
            .any(is_active_value),
        remaining: REMAINING_KEYS
            .iter()
            .find_map(|key| entry.get(*key).and_then(as_number)),
    }
}

fn is_active_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => ACTIVE_STRINGS.contains(&s.to_lowercase().as_str()),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
