use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::call::{CallMethod, CallStatus, StructuredCallData};

/// A candidate business surfaced by the (external) search adapter and
/// tracked for the lifetime of one `ServiceRequest`. Owned by the request;
/// cascade-deleted with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub request_id: Uuid,
    pub name: String,
    /// E.164 phone number.
    pub phone: String,
    pub rating: Option<f32>,
    pub review_count: Option<u32>,
    pub address: Option<String>,
    /// Opaque identifier assigned by the search vendor (e.g. a Google
    /// Places `place_id`). Never used as a foreign key — `id` is.
    pub place_id: Option<String>,
    pub distance_miles: Option<f64>,
    pub hours: Option<String>,
    pub is_open_now: Option<bool>,

    // Call-tracking fields, written once the call terminates.
    pub call_status: Option<CallStatus>,
    pub call_result: Option<StructuredCallData>,
    pub call_transcript: Option<String>,
    pub call_summary: Option<String>,
    pub call_duration_minutes: Option<f64>,
    pub call_cost: Option<f64>,
    pub call_method: Option<CallMethod>,
    pub call_id: Option<String>,
    pub called_at: Option<DateTime<Utc>>,

    // Booking fields.
    pub booking_confirmed: Option<bool>,
    pub booking_date: Option<String>,
    pub booking_time: Option<String>,
    pub confirmation_number: Option<String>,
}

impl Provider {
    pub fn new(request_id: Uuid, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            name: name.into(),
            phone: phone.into(),
            rating: None,
            review_count: None,
            address: None,
            place_id: None,
            distance_miles: None,
            hours: None,
            is_open_now: None,
            call_status: None,
            call_result: None,
            call_transcript: None,
            call_summary: None,
            call_duration_minutes: None,
            call_cost: None,
            call_method: None,
            call_id: None,
            called_at: None,
            booking_confirmed: None,
            booking_date: None,
            booking_time: None,
            confirmation_number: None,
        }
    }

    /// `true` once a terminal call status and result have both landed.
    pub fn has_terminal_call(&self) -> bool {
        self.call_status.map(CallStatus::is_terminal).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_provider_has_no_call_yet() {
        let p = Provider::new(Uuid::new_v4(), "Acme Plumbing", "+15551234567");
        assert!(!p.has_terminal_call());
        assert!(p.call_id.is_none());
    }

    #[test]
    fn terminal_once_status_set() {
        let mut p = Provider::new(Uuid::new_v4(), "Acme Plumbing", "+15551234567");
        p.call_status = Some(CallStatus::Completed);
        assert!(p.has_terminal_call());
    }

    #[test]
    fn in_progress_is_not_terminal() {
        let mut p = Provider::new(Uuid::new_v4(), "Acme Plumbing", "+15551234567");
        p.call_status = Some(CallStatus::InProgress);
        assert!(!p.has_terminal_call());
    }
}
