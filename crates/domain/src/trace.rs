use serde::Serialize;

/// Structured trace events emitted across the call-orchestrator crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CallStarted {
        call_id: String,
        provider_id: Option<String>,
        service_request_id: Option<String>,
        webhook_mode: bool,
    },
    WebhookReceived {
        call_id: Option<String>,
        event_type: String,
        accepted: bool,
    },
    EnrichmentAttempt {
        call_id: String,
        attempt: u32,
        data_complete: bool,
    },
    EnrichmentGaveUp {
        call_id: String,
        attempts: u32,
    },
    CacheHit {
        call_id: String,
        data_status: String,
    },
    CacheMiss {
        call_id: String,
    },
    RepositoryUpsert {
        call_id: String,
        provider_id: String,
        is_new: bool,
    },
    RequestTransitioned {
        request_id: String,
        from: String,
        to: String,
    },
    RecommendationsGenerated {
        request_id: String,
        candidate_count: usize,
        recommended_count: usize,
    },
    BatchCallCompleted {
        request_id: Option<String>,
        dispatched: usize,
        succeeded: usize,
        failed: usize,
    },
    BookingConfirmed {
        request_id: String,
        confirmed: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "vco_event");
    }
}
