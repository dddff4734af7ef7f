//! Validates and ingests vendor webhook bodies. See SPEC §4.6.
//!
//! Malformed bodies and uninteresting event types are acknowledged, never
//! rejected — a 4xx here would make the vendor retry a webhook that will
//! never parse any differently, so the gateway route always responds 200
//! regardless of what `handle` reports back for logging purposes.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use vco_cache::Cache;
use vco_domain::model::{CallMethod, DataStatus};
use vco_domain::trace::TraceEvent;
use vco_vendor::{VendorEvent, VoiceVendorClient};

use crate::call_mapping::call_result_from_vendor;
use crate::enricher::Enricher;

/// What happened to one webhook body. The gateway handler logs this but
/// always acks with 200 either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested { call_id: String },
    Ignored { event_type: String },
    Malformed { reason: String },
}

pub struct WebhookIngestor {
    vendor: Arc<dyn VoiceVendorClient>,
    cache: Cache,
    enricher: Arc<Enricher>,
}

impl WebhookIngestor {
    pub fn new(vendor: Arc<dyn VoiceVendorClient>, cache: Cache, enricher: Arc<Enricher>) -> Self {
        Self { vendor, cache, enricher }
    }

    pub async fn handle(&self, body: &[u8]) -> IngestOutcome {
        let event = match self.vendor.parse_webhook(body) {
            Ok(event) => event,
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(error = %reason, "malformed webhook payload");
                TraceEvent::WebhookReceived {
                    call_id: None,
                    event_type: "unknown".into(),
                    accepted: false,
                }
                .emit();
                return IngestOutcome::Malformed { reason };
            }
        };

        let call = match event {
            VendorEvent::EndOfCall(call) => call,
            VendorEvent::Other { event_type } => {
                TraceEvent::WebhookReceived {
                    call_id: None,
                    event_type: event_type.clone(),
                    accepted: false,
                }
                .emit();
                return IngestOutcome::Ignored { event_type };
            }
        };

        let provider_id = call.metadata.get("providerId").cloned();
        let service_request_id = call.metadata.get("serviceRequestId").cloned();

        let result = call_result_from_vendor(
            &call,
            CallMethod::Webhook,
            provider_id.clone(),
            service_request_id.clone(),
            Utc::now(),
        );
        let call_id = result.call_id.clone();

        self.cache.set(&call_id, result, DataStatus::Partial).await;

        TraceEvent::WebhookReceived {
            call_id: Some(call_id.clone()),
            event_type: "end-of-call-report".into(),
            accepted: true,
        }
        .emit();

        let enricher = self.enricher.clone();
        let parsed_provider_id = provider_id.as_deref().and_then(|s| Uuid::parse_str(s).ok());
        let parsed_request_id = service_request_id.as_deref().and_then(|s| Uuid::parse_str(s).ok());
        let spawned_call_id = call_id.clone();
        tokio::spawn(async move {
            enricher.run(&spawned_call_id, parsed_provider_id, parsed_request_id).await;
        });

        IngestOutcome::Ingested { call_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vco_store::{CallRepository, InMemoryCallRepository};
    use vco_vendor::MockVendorClient;

    fn webhook_body(call_id: &str, provider_id: Uuid, request_id: Uuid) -> Vec<u8> {
        serde_json::json!({
            "message": {
                "type": "end-of-call-report",
                "call": {
                    "id": call_id,
                    "status": "ended",
                    "endedReason": "customer-ended-call",
                    "durationMinutes": 2.0,
                    "transcript": "a".repeat(60),
                    "analysis": {"summary": "went well"},
                    "metadata": {
                        "providerId": provider_id.to_string(),
                        "serviceRequestId": request_id.to_string(),
                    }
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    fn ingestor() -> (WebhookIngestor, Cache) {
        let vendor: Arc<dyn VoiceVendorClient> = Arc::new(MockVendorClient::new());
        let cache = Cache::new(std::time::Duration::from_secs(60), std::time::Duration::from_secs(300));
        let repo: Arc<dyn CallRepository> = Arc::new(InMemoryCallRepository::new());
        let enricher = Arc::new(Enricher::new(vendor.clone(), cache.clone(), repo));
        (WebhookIngestor::new(vendor, cache.clone(), enricher), cache)
    }

    #[tokio::test]
    async fn malformed_body_is_acknowledged_not_rejected() {
        let (ingestor, _cache) = ingestor();
        let outcome = ingestor.handle(b"not json").await;
        assert!(matches!(outcome, IngestOutcome::Malformed { .. }));
    }

    #[tokio::test]
    async fn non_end_of_call_event_is_ignored() {
        let (ingestor, _cache) = ingestor();
        let body = serde_json::json!({"message": {"type": "status-update"}})
            .to_string()
            .into_bytes();
        let outcome = ingestor.handle(&body).await;
        assert_eq!(outcome, IngestOutcome::Ignored { event_type: "status-update".into() });
    }

    #[tokio::test]
    async fn end_of_call_event_writes_partial_entry_to_cache() {
        let (ingestor, cache) = ingestor();
        let provider_id = Uuid::new_v4();
        let request_id = Uuid::new_v4();
        let body = webhook_body("call-99", provider_id, request_id);
        let outcome = ingestor.handle(&body).await;
        assert_eq!(outcome, IngestOutcome::Ingested { call_id: "call-99".into() });
        let entry = cache.get("call-99").await.unwrap();
        assert_eq!(entry.data_status, DataStatus::Partial);
        assert_eq!(entry.result.provider_id.as_deref(), Some(provider_id.to_string().as_str()));
    }
}
