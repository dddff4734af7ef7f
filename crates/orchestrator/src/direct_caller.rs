//! Runs one outbound call lifecycle end to end: build the assistant
//! config, start the call, await a terminal result via whichever channel
//! observes it first (webhook-fed cache, or direct polling), and format
//! the result. See SPEC §4.5.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use vco_cache::Cache;
use vco_domain::model::{CallMethod, CallResult, CallStatus};
use vco_store::CallRepository;
use vco_vendor::{AssistantConfigBuilder, CallRequest, VoiceVendorClient, WebhookCorrelation};

use crate::call_mapping::{apply_call_result_to_provider, call_result_from_vendor, interaction_log_for_result};
use crate::cancel::CancelToken;

/// Correlates an outbound call with the stored `Provider`/`ServiceRequest`
/// rows it belongs to. `None` for ad-hoc calls placed outside the request
/// lifecycle (e.g. the standalone `/providers/call` route).
#[derive(Debug, Clone)]
pub struct DirectCallContext {
    pub provider_id: Uuid,
    pub request_id: Uuid,
}

impl DirectCallContext {
    fn to_webhook_correlation(&self) -> WebhookCorrelation {
        WebhookCorrelation {
            provider_id: Some(self.provider_id.to_string()),
            service_request_id: Some(self.request_id.to_string()),
        }
    }
}

pub struct DirectCaller {
    vendor: Arc<dyn VoiceVendorClient>,
    cache: Cache,
    repo: Arc<dyn CallRepository>,
    webhook_url: Option<String>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl DirectCaller {
    pub fn new(
        vendor: Arc<dyn VoiceVendorClient>,
        cache: Cache,
        repo: Arc<dyn CallRepository>,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            vendor,
            cache,
            repo,
            webhook_url,
            poll_interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }

    /// Shrinks the poll interval and attempt count — tests build a caller
    /// this way so a 5-minute timeout scenario runs in milliseconds.
    pub fn with_poll_schedule(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_attempts = max_attempts;
        self
    }

    /// Runs one call to completion (or timeout). `context` is `Some` for
    /// calls tied to a stored provider/request — when present *and*
    /// webhook mode is off, the terminal result is persisted directly
    /// (§4.5 step 5).
    pub async fn run(
        &self,
        request: &CallRequest,
        context: Option<DirectCallContext>,
        cancel: CancelToken,
    ) -> CallResult {
        self.run_with_builder(request, context, cancel, AssistantConfigBuilder::build)
            .await
    }

    /// Same as `run`, but builds the booking-call assistant prompt
    /// (SPEC §4.9 step 5) instead of the discovery prompt.
    pub async fn run_booking(
        &self,
        request: &CallRequest,
        context: Option<DirectCallContext>,
        cancel: CancelToken,
    ) -> CallResult {
        self.run_with_builder(request, context, cancel, AssistantConfigBuilder::build_booking)
            .await
    }

    async fn run_with_builder(
        &self,
        request: &CallRequest,
        context: Option<DirectCallContext>,
        cancel: CancelToken,
        build_assistant: fn(&CallRequest, Option<&str>, &WebhookCorrelation) -> vco_vendor::AssistantConfig,
    ) -> CallResult {
        let started_at = Utc::now();
        let webhook_mode = self.webhook_url.is_some() && context.is_some();
        let correlation = context
            .as_ref()
            .map(|c| c.to_webhook_correlation())
            .unwrap_or(WebhookCorrelation {
                provider_id: None,
                service_request_id: None,
            });

        let assistant = build_assistant(
            request,
            webhook_mode.then(|| self.webhook_url.as_deref()).flatten(),
            &correlation,
        );

        let started = match self
            .vendor
            .start_call(&request.provider_phone, &request.provider_name, assistant, None)
            .await
        {
            Ok(started) => started,
            Err(e) => {
                tracing::warn!(error = %e, provider = %request.provider_name, "start_call failed");
                return error_result(call_method(webhook_mode), &context, started_at);
            }
        };

        vco_domain::trace::TraceEvent::CallStarted {
            call_id: started.call_id.clone(),
            provider_id: context.as_ref().map(|c| c.provider_id.to_string()),
            service_request_id: context.as_ref().map(|c| c.request_id.to_string()),
            webhook_mode,
        }
        .emit();

        let result = if webhook_mode {
            self.await_via_cache(&started.call_id, started_at, &cancel).await
        } else {
            self.await_via_polling(&started.call_id, &context, started_at, &cancel)
                .await
        };

        if !webhook_mode {
            if let Some(ctx) = &context {
                self.persist_direct(ctx, &result).await;
            }
        }

        result
    }

    async fn await_via_cache(
        &self,
        call_id: &str,
        started_at: chrono::DateTime<Utc>,
        cancel: &CancelToken,
    ) -> CallResult {
        for _ in 0..self.max_attempts {
            if let Some(entry) = self.cache.get(call_id).await {
                return entry.result;
            }
            if cancel.is_cancelled() {
                return timeout_result(call_id, CallMethod::Webhook, started_at);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        timeout_result(call_id, CallMethod::Webhook, started_at)
    }

    async fn await_via_polling(
        &self,
        call_id: &str,
        context: &Option<DirectCallContext>,
        started_at: chrono::DateTime<Utc>,
        cancel: &CancelToken,
    ) -> CallResult {
        for _ in 0..self.max_attempts {
            if cancel.is_cancelled() {
                return timeout_result(call_id, CallMethod::Polling, started_at);
            }
            match self.vendor.get_call(call_id).await {
                Ok(call) if call.status.is_terminal() => {
                    let provider_id = context.as_ref().map(|c| c.provider_id.to_string());
                    let request_id = context.as_ref().map(|c| c.request_id.to_string());
                    return call_result_from_vendor(
                        &call,
                        CallMethod::Polling,
                        provider_id,
                        request_id,
                        started_at,
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, call_id, "vendor poll failed, retrying"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        timeout_result(call_id, CallMethod::Polling, started_at)
    }

    async fn persist_direct(&self, ctx: &DirectCallContext, result: &CallResult) {
        let Ok(Some(existing)) = self.repo.get_provider(ctx.provider_id).await else {
            return;
        };
        let updated = apply_call_result_to_provider(existing, result);
        if let Err(e) = self.repo.upsert_provider_call(ctx.provider_id, updated).await {
            tracing::warn!(error = %e, provider_id = %ctx.provider_id, "failed to persist direct call result");
        }

        let log = interaction_log_for_result(ctx.request_id, ctx.provider_id, result);
        if let Err(e) = self.repo.append_log(log).await {
            tracing::warn!(error = %e, provider_id = %ctx.provider_id, "failed to append interaction log");
        }
    }
}

fn call_method(webhook_mode: bool) -> CallMethod {
    if webhook_mode {
        CallMethod::Webhook
    } else {
        CallMethod::Polling
    }
}

fn error_result(
    call_method: CallMethod,
    context: &Option<DirectCallContext>,
    started_at: chrono::DateTime<Utc>,
) -> CallResult {
    use vco_domain::model::CallAnalysis;
    CallResult {
        call_id: format!("start-failed-{}", Uuid::new_v4()),
        status: CallStatus::Error,
        call_method,
        duration_minutes: None,
        ended_reason: Some("start_call failed".into()),
        transcript: None,
        transcript_lines: vec![],
        analysis: CallAnalysis::default(),
        cost: None,
        provider_id: context.as_ref().map(|c| c.provider_id.to_string()),
        service_request_id: context.as_ref().map(|c| c.request_id.to_string()),
        started_at,
    }
}

fn timeout_result(call_id: &str, call_method: CallMethod, started_at: chrono::DateTime<Utc>) -> CallResult {
    use vco_domain::model::CallAnalysis;
    CallResult {
        call_id: call_id.to_string(),
        status: CallStatus::Timeout,
        call_method,
        duration_minutes: None,
        ended_reason: Some("poll attempts exhausted".into()),
        transcript: None,
        transcript_lines: vec![],
        analysis: CallAnalysis::default(),
        cost: None,
        provider_id: None,
        service_request_id: None,
        started_at,
    }
}
