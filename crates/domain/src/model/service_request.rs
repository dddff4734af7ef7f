use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::recommendation::RecommendationSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredContact {
    Phone,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Immediate,
    Within24h,
    Within2d,
    Flexible,
}

/// The request-scoped state machine. See `allowed_transition` for the
/// forward-only DAG this type encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Searching,
    Calling,
    Analyzing,
    Recommended,
    Booking,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }

    /// Deserializing an unrecognized persisted value should not panic or
    /// error out a whole row — it maps back to the initial state so a
    /// schema addition elsewhere in the system can't corrupt existing data.
    pub fn from_str_or_initial(s: &str) -> Self {
        match s {
            "searching" => RequestStatus::Searching,
            "calling" => RequestStatus::Calling,
            "analyzing" => RequestStatus::Analyzing,
            "recommended" => RequestStatus::Recommended,
            "booking" => RequestStatus::Booking,
            "completed" => RequestStatus::Completed,
            "failed" => RequestStatus::Failed,
            _ => RequestStatus::Pending,
        }
    }
}

/// The only valid forward edges in the request lifecycle, plus the
/// universal escape to `Failed` from any non-terminal state. Backward
/// transitions, self-loops, and transitions out of a terminal state are
/// all rejected.
pub fn allowed_transition(from: RequestStatus, to: RequestStatus) -> bool {
    use RequestStatus::*;

    if from.is_terminal() {
        return false;
    }
    if to == Failed {
        return from != Failed;
    }
    matches!(
        (from, to),
        (Pending, Searching)
            | (Searching, Calling)
            | (Calling, Analyzing)
            | (Analyzing, Recommended)
            | (Recommended, Booking)
            | (Booking, Completed)
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Free-text constraints the provider must satisfy (e.g. "licensed,
    /// available today, speaks Spanish").
    pub criteria: Vec<String>,
    pub location: String,
    pub user_phone: Option<String>,
    pub preferred_contact: PreferredContact,
    pub urgency: Urgency,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub recommendations: Option<RecommendationSet>,
    pub final_outcome: Option<String>,
}

impl ServiceRequest {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        criteria: Vec<String>,
        location: impl Into<String>,
        preferred_contact: PreferredContact,
        urgency: Urgency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            criteria,
            location: location.into(),
            user_phone: None,
            preferred_contact,
            urgency,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            notification_sent_at: None,
            recommendations: None,
            final_outcome: None,
        }
    }
}
