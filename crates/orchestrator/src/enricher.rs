//! Staggered background retries that fetch the vendor's complete call
//! data after a webhook delivered only a partial result. See SPEC §4.7.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use vco_cache::Cache;
use vco_domain::model::{DataStatus, InteractionLog, LogStatus};
use vco_domain::trace::TraceEvent;
use vco_store::CallRepository;
use vco_vendor::VoiceVendorClient;

use crate::call_mapping::{apply_call_result_to_provider, call_result_from_vendor};

/// Cumulative delay schedule: sleep 3s, attempt; sleep 5 more (t=8s),
/// attempt; sleep 8 more (t=16s), attempt; then give up.
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(3),
    Duration::from_secs(5),
    Duration::from_secs(8),
];

pub struct Enricher {
    vendor: Arc<dyn VoiceVendorClient>,
    cache: Cache,
    repo: Arc<dyn CallRepository>,
    retry_delays: Vec<Duration>,
}

impl Enricher {
    pub fn new(vendor: Arc<dyn VoiceVendorClient>, cache: Cache, repo: Arc<dyn CallRepository>) -> Self {
        Self {
            vendor,
            cache,
            repo,
            retry_delays: RETRY_DELAYS.to_vec(),
        }
    }

    /// Overrides the retry schedule — tests use millisecond delays so the
    /// 16-second real schedule doesn't make the suite slow.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub async fn run(&self, call_id: &str, provider_id: Option<Uuid>, request_id: Option<Uuid>) {
        let attempts = self.retry_delays.len() as u32;
        for (i, delay) in self.retry_delays.iter().enumerate() {
            tokio::time::sleep(*delay).await;

            let call = match self.vendor.get_call(call_id).await {
                Ok(call) => call,
                Err(e) => {
                    tracing::warn!(error = %e, call_id, attempt = i + 1, "enrichment fetch failed, retrying");
                    continue;
                }
            };

            let data_complete = self.vendor.is_data_complete(&call);
            TraceEvent::EnrichmentAttempt {
                call_id: call_id.to_string(),
                attempt: (i + 1) as u32,
                data_complete,
            }
            .emit();

            if !data_complete {
                continue;
            }

            let enriched = call_result_from_vendor(
                &call,
                vco_domain::model::CallMethod::Webhook,
                provider_id.map(|id| id.to_string()),
                request_id.map(|id| id.to_string()),
                Utc::now(),
            );
            self.cache.merge(call_id, enriched).await;

            if let Some(request_id) = request_id {
                self.persist(request_id, provider_id, call_id).await;
            }
            return;
        }

        TraceEvent::EnrichmentGaveUp {
            call_id: call_id.to_string(),
            attempts,
        }
        .emit();
        self.cache.update_fetch_status(call_id, DataStatus::FetchFailed).await;

        // Persist whatever partial result we have so the request can still
        // progress — the spec is explicit that a failed enrichment must
        // not block the state machine. Only a Warning log is appended
        // here; `persist_provider` writes the provider row but not a log,
        // since a "gave up" outcome must not also be recorded as success.
        if let (Some(request_id), Some(entry)) = (request_id, self.cache.get(call_id).await) {
            if let Some(provider_id) = provider_id {
                self.persist_provider(provider_id, &entry.result).await;
            }
            let _ = self
                .repo
                .append_log(
                    InteractionLog::new(
                        request_id,
                        "enrichment",
                        format!("gave up after {attempts} attempts, data_status={:?}", entry.data_status),
                        LogStatus::Warning,
                    )
                    .with_call(provider_id.unwrap_or(request_id), call_id),
                )
                .await;
        }
    }

    /// Writes the merged `CallResult` onto the provider row and appends a
    /// success log. Used only on the "enrichment completed" path — the
    /// give-up path persists the provider row via `persist_provider`
    /// directly, without a success log, so a `fetch_failed` outcome isn't
    /// recorded as a success under the repository's `call_id` dedup.
    async fn persist(&self, request_id: Uuid, provider_id: Option<Uuid>, call_id: &str) {
        let Some(entry) = self.cache.get(call_id).await else {
            return;
        };

        if let Some(provider_id) = provider_id {
            self.persist_provider(provider_id, &entry.result).await;
        }

        let log = InteractionLog::new(
            request_id,
            "enrichment",
            entry.result.analysis.summary.clone().unwrap_or_else(|| "call enriched".into()),
            LogStatus::Success,
        )
        .with_call(provider_id.unwrap_or(request_id), call_id);
        let _ = self.repo.append_log(log).await;
    }

    async fn persist_provider(&self, provider_id: Uuid, result: &vco_domain::model::CallResult) {
        if let Ok(Some(existing)) = self.repo.get_provider(provider_id).await {
            let updated = apply_call_result_to_provider(existing, result);
            if let Err(e) = self.repo.upsert_provider_call(provider_id, updated).await {
                tracing::warn!(error = %e, provider_id = %provider_id, "enrichment persist failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vco_domain::model::{PreferredContact, Provider, ServiceRequest, Urgency};
    use vco_vendor::{MockVendorClient, VendorAnalysis, VendorArtifact, VendorCall, VendorCallState};

    fn in_progress_call(call_id: &str) -> VendorCall {
        VendorCall {
            id: call_id.into(),
            status: VendorCallState::InProgress,
            ended_reason: None,
            duration_minutes: None,
            transcript: None,
            artifact: None,
            analysis: None,
            cost_breakdown: None,
            metadata: HashMap::new(),
        }
    }

    fn complete_call(call_id: &str) -> VendorCall {
        VendorCall {
            id: call_id.into(),
            status: VendorCallState::Ended,
            ended_reason: Some("customer-ended-call".into()),
            duration_minutes: Some(3.0),
            transcript: Some("a".repeat(80)),
            artifact: Some(VendorArtifact { transcript: None }),
            analysis: Some(VendorAnalysis {
                summary: Some("plumber is available tomorrow".into()),
                structured_data: None,
                success_evaluation: None,
            }),
            cost_breakdown: None,
            metadata: HashMap::new(),
        }
    }

    async fn setup() -> (Arc<MockVendorClient>, Cache, Arc<dyn CallRepository>, Uuid, Uuid) {
        let vendor = Arc::new(MockVendorClient::new());
        let cache = Cache::new(Duration::from_secs(60), Duration::from_secs(300));
        let repo: Arc<dyn CallRepository> = Arc::new(vco_store::InMemoryCallRepository::new());

        let request = ServiceRequest::new(
            "Find a plumber",
            "leak",
            vec!["licensed".into()],
            "Greenville, SC",
            PreferredContact::Phone,
            Urgency::Within24h,
        );
        let request_id = request.id;
        repo.insert_request(request).await.unwrap();
        let provider = Provider::new(request_id, "Acme", "+15551234567");
        let provider_id = provider.id;
        repo.insert_providers(vec![provider]).await.unwrap();

        (vendor, cache, repo, provider_id, request_id)
    }

    #[tokio::test]
    async fn gives_up_and_marks_fetch_failed_when_never_complete() {
        let (vendor, cache, repo, provider_id, request_id) = setup().await;
        vendor.script("call-1", vec![in_progress_call("call-1")]);
        cache
            .set(
                "call-1",
                sample_partial_result("call-1", provider_id, request_id),
                DataStatus::Partial,
            )
            .await;

        let enricher = Enricher::new(vendor, cache.clone(), repo.clone())
            .with_retry_delays(vec![Duration::from_millis(1); 3]);
        enricher.run("call-1", Some(provider_id), Some(request_id)).await;

        let entry = cache.get("call-1").await.unwrap();
        assert_eq!(entry.data_status, DataStatus::FetchFailed);

        let logs = repo.get_logs(request_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, LogStatus::Warning);
        assert_eq!(logs[0].call_id.as_deref(), Some("call-1"));
    }

    #[tokio::test]
    async fn merges_and_persists_once_vendor_reports_complete() {
        let (vendor, cache, repo, provider_id, request_id) = setup().await;
        vendor.script(
            "call-2",
            vec![
                in_progress_call("call-2"),
                in_progress_call("call-2"),
                complete_call("call-2"),
            ],
        );
        cache
            .set(
                "call-2",
                sample_partial_result("call-2", provider_id, request_id),
                DataStatus::Partial,
            )
            .await;

        let enricher = Enricher::new(vendor, cache.clone(), repo.clone())
            .with_retry_delays(vec![Duration::from_millis(1); 3]);
        enricher.run("call-2", Some(provider_id), Some(request_id)).await;

        let entry = cache.get("call-2").await.unwrap();
        assert_eq!(entry.data_status, DataStatus::Complete);
        assert!(entry.result.transcript.unwrap().len() > 50);

        let provider = repo.get_provider(provider_id).await.unwrap().unwrap();
        assert_eq!(provider.call_id.as_deref(), Some("call-2"));

        let logs = repo.get_logs(request_id).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    fn sample_partial_result(
        call_id: &str,
        provider_id: Uuid,
        request_id: Uuid,
    ) -> vco_domain::model::CallResult {
        vco_domain::model::CallResult {
            call_id: call_id.to_string(),
            status: vco_domain::model::CallStatus::InProgress,
            call_method: vco_domain::model::CallMethod::Webhook,
            duration_minutes: None,
            ended_reason: None,
            transcript: Some("short".into()),
            transcript_lines: vec![],
            analysis: vco_domain::model::CallAnalysis::default(),
            cost: None,
            provider_id: Some(provider_id.to_string()),
            service_request_id: Some(request_id.to_string()),
            started_at: Utc::now(),
        }
    }
}
