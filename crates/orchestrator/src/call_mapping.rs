//! Shared conversions between the vendor's wire shapes and this crate's
//! domain model: a vendor `VendorCall` snapshot becomes a `CallResult`,
//! and a terminal `CallResult` gets folded onto a stored `Provider` row.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use vco_domain::model::{
    CallAnalysis, CallMethod, CallResult, CallStatus, InteractionLog, LogStatus, Provider,
    StructuredCallData, TranscriptLine,
};
use vco_vendor::{VendorCall, VendorCallState};

/// Maps the vendor's own lifecycle (`status` + `endedReason`) onto our
/// `CallStatus` taxonomy (§7). There's no shared vocabulary to ground this
/// on beyond the vendor's documented `endedReason` values, so the mapping
/// is deliberately conservative: anything not explicitly recognized but
/// still `ended` counts as `Completed` rather than silently dropped.
pub fn map_call_status(call: &VendorCall) -> CallStatus {
    if call.status != VendorCallState::Ended {
        return CallStatus::InProgress;
    }
    match call.ended_reason.as_deref() {
        Some("customer-did-not-answer") | Some("no-answer") => CallStatus::NoAnswer,
        Some("voicemail") => CallStatus::Voicemail,
        Some("busy") | Some("line-busy") => CallStatus::Busy,
        Some(reason) if reason.contains("error") || reason.contains("failed") => {
            CallStatus::Error
        }
        _ => CallStatus::Completed,
    }
}

/// Builds a `CallResult` from a vendor snapshot. `started_at` is carried
/// in separately since the vendor snapshot alone doesn't report when the
/// call was dispatched.
pub fn call_result_from_vendor(
    call: &VendorCall,
    call_method: CallMethod,
    provider_id: Option<String>,
    service_request_id: Option<String>,
    started_at: DateTime<Utc>,
) -> CallResult {
    let structured_data = call
        .analysis
        .as_ref()
        .and_then(|a| a.structured_data.clone())
        .and_then(|v| serde_json::from_value::<StructuredCallData>(v).ok());

    CallResult {
        call_id: call.id.clone(),
        status: map_call_status(call),
        call_method,
        duration_minutes: call.duration_minutes,
        ended_reason: call.ended_reason.clone(),
        transcript: call.best_transcript().map(|s| s.to_string()),
        transcript_lines: Vec::<TranscriptLine>::new(),
        analysis: CallAnalysis {
            summary: call.analysis.as_ref().and_then(|a| a.summary.clone()),
            structured_data,
            success_evaluation: call
                .analysis
                .as_ref()
                .and_then(|a| a.success_evaluation.clone()),
        },
        cost: call.cost_breakdown.as_ref().and_then(|c| c.total),
        provider_id,
        service_request_id,
        started_at,
    }
}

/// Folds a terminal `CallResult` onto a provider row's call-tracking and
/// sets `called_at` to now. Booking-specific fields are left untouched —
/// `parse_booking_confirmation` (in `request_orchestrator.rs`) owns those.
pub fn apply_call_result_to_provider(mut provider: Provider, result: &CallResult) -> Provider {
    provider.call_status = Some(result.status);
    provider.call_result = result.analysis.structured_data.clone();
    provider.call_transcript = result.transcript.clone();
    provider.call_summary = result.analysis.summary.clone();
    provider.call_duration_minutes = result.duration_minutes;
    provider.call_cost = result.cost;
    provider.call_method = Some(result.call_method);
    provider.call_id = Some(result.call_id.clone());
    provider.called_at = Some(Utc::now());
    provider
}

/// The severity a terminal call's interaction log entry should carry:
/// timeouts and vendor errors are warnings, everything else is routine.
pub fn log_status_for_call(status: CallStatus) -> LogStatus {
    match status {
        CallStatus::Timeout | CallStatus::Error => LogStatus::Warning,
        _ => LogStatus::Success,
    }
}

/// Builds the one `InteractionLog` a terminal call result produces,
/// regardless of whether it was observed via polling or webhook —
/// the repository's `call_id` uniqueness collapses a duplicate from the
/// other path into a no-op (§4.7/§8).
pub fn interaction_log_for_result(request_id: Uuid, provider_id: Uuid, result: &CallResult) -> InteractionLog {
    InteractionLog::new(
        request_id,
        "call_completed",
        format!("call ended with status {:?} via {:?}", result.status, result.call_method),
        log_status_for_call(result.status),
    )
    .with_call(provider_id, result.call_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vco_vendor::{VendorAnalysis, VendorArtifact};

    fn ended(reason: Option<&str>) -> VendorCall {
        VendorCall {
            id: "call-1".into(),
            status: VendorCallState::Ended,
            ended_reason: reason.map(|s| s.to_string()),
            duration_minutes: Some(1.5),
            transcript: Some("hello there".into()),
            artifact: Some(VendorArtifact { transcript: None }),
            analysis: Some(VendorAnalysis {
                summary: Some("went fine".into()),
                structured_data: None,
                success_evaluation: None,
            }),
            cost_breakdown: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn maps_no_answer() {
        assert_eq!(map_call_status(&ended(Some("no-answer"))), CallStatus::NoAnswer);
    }

    #[test]
    fn maps_voicemail() {
        assert_eq!(map_call_status(&ended(Some("voicemail"))), CallStatus::Voicemail);
    }

    #[test]
    fn unrecognized_ended_reason_defaults_to_completed() {
        assert_eq!(map_call_status(&ended(Some("customer-ended-call"))), CallStatus::Completed);
    }

    #[test]
    fn not_ended_is_in_progress() {
        let mut call = ended(None);
        call.status = VendorCallState::InProgress;
        assert_eq!(map_call_status(&call), CallStatus::InProgress);
    }

    #[test]
    fn builds_call_result_with_carried_started_at() {
        let started = Utc::now() - chrono::Duration::minutes(5);
        let result = call_result_from_vendor(
            &ended(Some("customer-ended-call")),
            CallMethod::Polling,
            Some("p1".into()),
            Some("r1".into()),
            started,
        );
        assert_eq!(result.call_id, "call-1");
        assert_eq!(result.started_at, started);
        assert_eq!(result.status, CallStatus::Completed);
    }

    #[test]
    fn timeout_and_error_log_as_warning() {
        assert_eq!(log_status_for_call(CallStatus::Timeout), vco_domain::model::LogStatus::Warning);
        assert_eq!(log_status_for_call(CallStatus::Error), vco_domain::model::LogStatus::Warning);
        assert_eq!(log_status_for_call(CallStatus::Completed), vco_domain::model::LogStatus::Success);
    }

    #[test]
    fn interaction_log_carries_call_id_and_request_id() {
        let request_id = uuid::Uuid::new_v4();
        let provider_id = uuid::Uuid::new_v4();
        let result = call_result_from_vendor(
            &ended(Some("customer-ended-call")),
            CallMethod::Polling,
            None,
            None,
            Utc::now(),
        );
        let log = interaction_log_for_result(request_id, provider_id, &result);
        assert_eq!(log.request_id, request_id);
        assert_eq!(log.provider_id, Some(provider_id));
        assert_eq!(log.call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn apply_to_provider_sets_call_fields() {
        let provider = Provider::new(uuid::Uuid::new_v4(), "Acme", "+15551234567");
        let result = call_result_from_vendor(
            &ended(Some("customer-ended-call")),
            CallMethod::Webhook,
            None,
            None,
            Utc::now(),
        );
        let updated = apply_call_result_to_provider(provider, &result);
        assert_eq!(updated.call_id.as_deref(), Some("call-1"));
        assert_eq!(updated.call_method, Some(CallMethod::Webhook));
        assert!(updated.called_at.is_some());
    }
}
