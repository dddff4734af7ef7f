//! Bounded-concurrency fan-out over a batch of providers. See SPEC §4.8.
//!
//! Grounded on the gateway's per-session `Semaphore`-gated task runner
//! (`crates/gateway/src/runtime/tasks.rs`): here the semaphore is scoped
//! to one batch run instead of one session, since every item in a batch
//! shares the same concurrency budget.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;

use vco_domain::model::{CallAnalysis, CallMethod, CallResult, CallStatus};
use vco_vendor::CallRequest;

use crate::cancel::CancelToken;
use crate::direct_caller::{DirectCallContext, DirectCaller};

/// One unit of work: the per-provider call request plus the context that
/// ties its result back to a stored `Provider`/`ServiceRequest`.
pub struct BatchItem {
    pub context: DirectCallContext,
    pub request: CallRequest,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub results: Vec<CallResult>,
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct BatchCaller {
    caller: Arc<DirectCaller>,
}

impl BatchCaller {
    pub fn new(caller: Arc<DirectCaller>) -> Self {
        Self { caller }
    }

    /// Runs every item with at most `max_concurrent` (clamped 1..=10)
    /// `DirectCaller` tasks in flight at once. Results come back in the
    /// same order `items` was given. If `cancel` is already set, or
    /// becomes set before a queued item's turn arrives, that item is
    /// never dispatched to the vendor at all.
    pub async fn run(
        &self,
        items: Vec<BatchItem>,
        max_concurrent: usize,
        cancel: CancelToken,
    ) -> BatchOutcome {
        let permits = max_concurrent.clamp(1, 10);
        let semaphore = Arc::new(Semaphore::new(permits));
        let dispatched = items.len();

        let mut handles = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let caller = self.caller.clone();
            let cancel = cancel.clone();
            handles.push((
                index,
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("batch semaphore is never closed early");

                    if cancel.is_cancelled() {
                        return not_dispatched_result(&item.context);
                    }

                    caller.run(&item.request, Some(item.context), cancel).await
                }),
            ));
        }

        let mut results: Vec<Option<CallResult>> = (0..dispatched).map(|_| None).collect();
        for (index, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, "direct caller task panicked");
                    task_panicked_result()
                }
            };
            results[index] = Some(result);
        }

        let results: Vec<CallResult> = results.into_iter().map(|r| r.expect("every index filled")).collect();
        let succeeded = results
            .iter()
            .filter(|r| matches!(r.status, CallStatus::Completed))
            .count();
        let failed = results.len() - succeeded;

        vco_domain::trace::TraceEvent::BatchCallCompleted {
            request_id: results
                .first()
                .and_then(|r| r.service_request_id.clone()),
            dispatched,
            succeeded,
            failed,
        }
        .emit();

        BatchOutcome {
            results,
            dispatched,
            succeeded,
            failed,
        }
    }
}

fn not_dispatched_result(context: &DirectCallContext) -> CallResult {
    CallResult {
        call_id: format!("not-dispatched-{}", context.provider_id),
        status: CallStatus::Timeout,
        call_method: CallMethod::Polling,
        duration_minutes: None,
        ended_reason: Some("batch cancelled before dispatch".into()),
        transcript: None,
        transcript_lines: vec![],
        analysis: CallAnalysis::default(),
        cost: None,
        provider_id: Some(context.provider_id.to_string()),
        service_request_id: Some(context.request_id.to_string()),
        started_at: Utc::now(),
    }
}

fn task_panicked_result() -> CallResult {
    CallResult {
        call_id: "panicked-task".into(),
        status: CallStatus::Error,
        call_method: CallMethod::Polling,
        duration_minutes: None,
        ended_reason: Some("direct caller task panicked".into()),
        transcript: None,
        transcript_lines: vec![],
        analysis: CallAnalysis::default(),
        cost: None,
        provider_id: None,
        service_request_id: None,
        started_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;
    use vco_cache::Cache;
    use vco_store::{CallRepository, InMemoryCallRepository};
    use vco_vendor::MockVendorClient;

    fn sample_request(name: &str, phone: &str) -> CallRequest {
        CallRequest {
            service_needed: "plumbing repair".into(),
            user_criteria: vec!["licensed".into()],
            location: "Greenville, SC".into(),
            urgency: "within_24h".into(),
            provider_name: name.into(),
            provider_phone: phone.into(),
        }
    }

    #[tokio::test]
    async fn runs_items_and_preserves_input_order() {
        let vendor = Arc::new(MockVendorClient::new());
        let cache = Cache::new(Duration::from_secs(60), Duration::from_secs(300));
        let repo: Arc<dyn CallRepository> = Arc::new(InMemoryCallRepository::new());
        let caller = Arc::new(
            DirectCaller::new(vendor, cache, repo, None).with_poll_schedule(Duration::from_millis(5), 3),
        );
        let batch = BatchCaller::new(caller);

        let request_id = Uuid::new_v4();
        let items: Vec<BatchItem> = (0..4)
            .map(|i| BatchItem {
                context: DirectCallContext {
                    provider_id: Uuid::new_v4(),
                    request_id,
                },
                request: sample_request(&format!("Provider {i}"), "+15551230000"),
            })
            .collect();
        let provider_ids: Vec<Uuid> = items.iter().map(|i| i.context.provider_id).collect();

        let outcome = batch.run(items, 2, CancelToken::new()).await;

        assert_eq!(outcome.dispatched, 4);
        assert_eq!(outcome.results.len(), 4);
        // All providers time out against the unscripted mock vendor, but
        // the order must still track the input order exactly.
        let result_provider_ids: Vec<Uuid> = outcome
            .results
            .iter()
            .map(|r| Uuid::parse_str(r.provider_id.as_ref().unwrap()).unwrap())
            .collect();
        assert_eq!(result_provider_ids, provider_ids);
    }

    #[tokio::test]
    async fn cancelled_before_run_never_dispatches_any_item() {
        let vendor = Arc::new(MockVendorClient::new());
        let cache = Cache::new(Duration::from_secs(60), Duration::from_secs(300));
        let repo: Arc<dyn CallRepository> = Arc::new(InMemoryCallRepository::new());
        let caller = Arc::new(
            DirectCaller::new(vendor, cache, repo, None).with_poll_schedule(Duration::from_millis(5), 3),
        );
        let batch = BatchCaller::new(caller);

        let request_id = Uuid::new_v4();
        let items = vec![BatchItem {
            context: DirectCallContext {
                provider_id: Uuid::new_v4(),
                request_id,
            },
            request: sample_request("Acme", "+15551230000"),
        }];

        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = batch.run(items, 2, cancel).await;
        assert_eq!(outcome.results[0].ended_reason.as_deref(), Some("batch cancelled before dispatch"));
    }
}
