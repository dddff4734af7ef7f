use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Call outcome taxonomy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    NoAnswer,
    Voicemail,
    Busy,
    Error,
    Timeout,
}

impl CallStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CallStatus::Queued | CallStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallMethod {
    Webhook,
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    Partial,
    Fetching,
    Complete,
    FetchFailed,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Structured call data (the vendor-side analysis payload)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable,
    CallbackRequested,
    Unclear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Positive,
    Negative,
    Neutral,
    NoAnswer,
    Voicemail,
    Busy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredCallData {
    pub availability: Availability,
    pub estimated_rate: Option<String>,
    pub single_person_found: bool,
    pub technician_name: Option<String>,
    pub all_criteria_met: bool,
    #[serde(default)]
    pub criteria_details: HashMap<String, bool>,
    pub call_outcome: CallOutcome,
    #[serde(default)]
    pub recommended: bool,
    #[serde(default)]
    pub disqualified: bool,
    pub disqualification_reason: Option<String>,
    pub earliest_availability: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CallAnalysis {
    pub summary: Option<String>,
    pub structured_data: Option<StructuredCallData>,
    pub success_evaluation: Option<String>,
}

/// A single transcript line as recorded by the vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: String,
    pub text: String,
}

/// The normalized unit exchanged between the cache, `DirectCaller`, and
/// `CallRepository`. This is what a vendor's raw call snapshot gets mapped
/// into as soon as it's observed, regardless of whether it arrived via
/// webhook or polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    pub call_id: String,
    pub status: CallStatus,
    pub call_method: CallMethod,
    pub duration_minutes: Option<f64>,
    pub ended_reason: Option<String>,
    pub transcript: Option<String>,
    #[serde(default)]
    pub transcript_lines: Vec<TranscriptLine>,
    #[serde(default)]
    pub analysis: CallAnalysis,
    pub cost: Option<f64>,
    pub provider_id: Option<String>,
    pub service_request_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl CallResult {
    /// Merge `enriched` data on top of this (partial) result. The longer
    /// transcript wins; non-empty analysis fields from `enriched` override.
    /// Always ends in `status = Completed` unless `enriched` itself is a
    /// non-completed terminal status (e.g. still `error`).
    pub fn merge(&mut self, enriched: CallResult) {
        if enriched
            .transcript
            .as_ref()
            .map(|t| t.len())
            .unwrap_or(0)
            >= self.transcript.as_ref().map(|t| t.len()).unwrap_or(0)
        {
            self.transcript = enriched.transcript;
            self.transcript_lines = enriched.transcript_lines;
        }
        if enriched.analysis.summary.is_some() {
            self.analysis.summary = enriched.analysis.summary;
        }
        if enriched.analysis.structured_data.is_some() {
            self.analysis.structured_data = enriched.analysis.structured_data;
        }
        if enriched.analysis.success_evaluation.is_some() {
            self.analysis.success_evaluation = enriched.analysis.success_evaluation;
        }
        if enriched.duration_minutes.is_some() {
            self.duration_minutes = enriched.duration_minutes;
        }
        if enriched.cost.is_some() {
            self.cost = enriched.cost;
        }
        if enriched.ended_reason.is_some() {
            self.ended_reason = enriched.ended_reason;
        }
        self.status = enriched.status;
    }
}

/// A cached entry wrapping a `CallResult` with freshness/enrichment state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    pub result: CallResult,
    pub data_status: DataStatus,
    pub webhook_received_at: Option<DateTime<Utc>>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl CachedEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_status_classification() {
        assert!(!CallStatus::Queued.is_terminal());
        assert!(!CallStatus::InProgress.is_terminal());
        assert!(CallStatus::Completed.is_terminal());
        assert!(CallStatus::Timeout.is_terminal());
        assert!(CallStatus::NoAnswer.is_terminal());
    }

    fn base_result(transcript: &str) -> CallResult {
        CallResult {
            call_id: "call-1".into(),
            status: CallStatus::InProgress,
            call_method: CallMethod::Webhook,
            duration_minutes: None,
            ended_reason: None,
            transcript: Some(transcript.into()),
            transcript_lines: vec![],
            analysis: CallAnalysis::default(),
            cost: None,
            provider_id: Some("p1".into()),
            service_request_id: Some("r1".into()),
            started_at: Utc::now(),
        }
    }

    #[test]
    fn merge_prefers_longer_transcript() {
        let mut partial = base_result("short");
        let mut enriched = base_result("a much longer transcript than before");
        enriched.status = CallStatus::Completed;
        partial.merge(enriched);
        assert_eq!(partial.transcript.unwrap(), "a much longer transcript than before");
        assert_eq!(partial.status, CallStatus::Completed);
    }

    #[test]
    fn merge_keeps_existing_when_enriched_is_shorter() {
        let mut partial = base_result("a much longer transcript than before");
        let mut enriched = base_result("short");
        enriched.status = CallStatus::Completed;
        partial.merge(enriched);
        assert_eq!(partial.transcript.unwrap(), "a much longer transcript than before");
    }

    #[test]
    fn cached_entry_expiry() {
        let entry = CachedEntry {
            result: base_result("x"),
            data_status: DataStatus::Partial,
            webhook_received_at: Some(Utc::now()),
            fetched_at: None,
            expires_at: Utc::now() - chrono::Duration::seconds(1),
        };
        assert!(entry.is_expired(Utc::now()));
    }
}
