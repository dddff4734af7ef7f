//! Drives one `ServiceRequest` through its full lifecycle: search,
//! concurrent calling, analysis/recommendation, and — once the user
//! selects a provider — booking. See SPEC §4.9.

use std::sync::Arc;

use regex::Regex;
use uuid::Uuid;

use vco_domain::error::{Error, Result};
use vco_domain::model::{Provider, RequestStatus, StructuredCallData};
use vco_store::CallRepository;
use vco_vendor::CallRequest;

use crate::batch_caller::{BatchCaller, BatchItem};
use crate::call_mapping::{apply_call_result_to_provider, interaction_log_for_result};
use crate::cancel::{CancelMap, CancelToken};
use crate::direct_caller::{DirectCallContext, DirectCaller};
use crate::recommender::Recommender;
use crate::search::SearchAdapter;

/// What `parse_booking_confirmation` extracted from a completed booking
/// call's structured data (§10.7).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BookingFields {
    confirmed: bool,
    date: Option<String>,
    time: Option<String>,
    confirmation_number: Option<String>,
}

pub struct RequestOrchestrator {
    search: Arc<dyn SearchAdapter>,
    batch_caller: Arc<BatchCaller>,
    direct_caller: Arc<DirectCaller>,
    recommender: Recommender,
    repo: Arc<dyn CallRepository>,
    cancel_map: Arc<CancelMap>,
    max_concurrent: usize,
}

impl RequestOrchestrator {
    pub fn new(
        search: Arc<dyn SearchAdapter>,
        batch_caller: Arc<BatchCaller>,
        direct_caller: Arc<DirectCaller>,
        repo: Arc<dyn CallRepository>,
        cancel_map: Arc<CancelMap>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            search,
            batch_caller,
            direct_caller,
            recommender: Recommender::new(),
            repo,
            cancel_map,
            max_concurrent: max_concurrent.clamp(1, 10),
        }
    }

    /// Runs SEARCHING through RECOMMENDED synchronously. `request_id` must
    /// already be persisted in `PENDING`.
    pub async fn run_discovery(&self, request_id: Uuid) -> Result<()> {
        let request = self
            .repo
            .get_request(request_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("no such request: {request_id}")))?;

        self.transition(request_id, RequestStatus::Searching).await?;

        let candidates = self.search.search(&request.title, &request.location).await?;
        if candidates.is_empty() {
            self.fail(request_id, "no providers found for this request").await;
            return Ok(());
        }

        let providers: Vec<Provider> = candidates
            .into_iter()
            .map(|c| {
                let mut p = Provider::new(request_id, c.name, c.phone);
                p.rating = c.rating;
                p.review_count = c.review_count;
                p.address = c.address;
                p.place_id = c.place_id;
                p.distance_miles = c.distance_miles;
                p.hours = c.hours;
                p.is_open_now = c.is_open_now;
                p
            })
            .collect();
        self.repo.insert_providers(providers).await?;

        self.transition(request_id, RequestStatus::Calling).await?;

        let cancel = self.cancel_map.register(&request_id.to_string());
        let urgency = urgency_str(request.urgency);
        let providers = self.repo.get_providers(request_id).await?;
        let items: Vec<BatchItem> = providers
            .iter()
            .map(|p| BatchItem {
                context: DirectCallContext {
                    provider_id: p.id,
                    request_id,
                },
                request: CallRequest {
                    service_needed: request.title.clone(),
                    user_criteria: request.criteria.clone(),
                    location: request.location.clone(),
                    urgency: urgency.to_string(),
                    provider_name: p.name.clone(),
                    provider_phone: p.phone.clone(),
                },
            })
            .collect();

        let outcome = self.batch_caller.run(items, self.max_concurrent, cancel.clone()).await;
        self.cancel_map.remove(&request_id.to_string());

        // Idempotent: providers already persisted via the webhook/enricher
        // path keep their existing call_id and this is a no-op for them.
        // Providers whose only observer was this batch run (polling mode,
        // or a cancelled/timed-out dispatch) get persisted here.
        for result in &outcome.results {
            let Some(provider_id) = result.provider_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()) else {
                continue;
            };
            if let Ok(Some(existing)) = self.repo.get_provider(provider_id).await {
                if existing.call_id.as_deref() == Some(result.call_id.as_str()) {
                    continue;
                }
                let updated = apply_call_result_to_provider(existing, result);
                let _ = self.repo.upsert_provider_call(provider_id, updated).await;
                let log = interaction_log_for_result(request_id, provider_id, result);
                let _ = self.repo.append_log(log).await;
            }
        }

        if cancel.is_cancelled() {
            self.fail(request_id, "request was cancelled during calling").await;
            return Ok(());
        }

        self.transition(request_id, RequestStatus::Analyzing).await?;

        let providers = self.repo.get_providers(request_id).await?;
        let recommendations = self.recommender.recommend(request_id, &providers);
        self.repo.save_recommendations(request_id, recommendations).await?;

        Ok(())
    }

    /// Runs the booking call for the provider the user selected out of a
    /// `RECOMMENDED` request's recommendation set. Transitions to
    /// `COMPLETED` on a parsed confirmation. A booking call that doesn't
    /// yield a confirmation can't transition backward to `RECOMMENDED` (the
    /// DAG is forward-only), so it escapes to `FAILED` instead, carrying
    /// the reason in `finalOutcome` — see DESIGN.md for this call.
    pub async fn run_booking(&self, request_id: Uuid, provider_id: Uuid) -> Result<()> {
        let request = self
            .repo
            .get_request(request_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("no such request: {request_id}")))?;
        let provider = self
            .repo
            .get_provider(provider_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("no such provider: {provider_id}")))?;

        self.transition(request_id, RequestStatus::Booking).await?;

        let call_request = CallRequest {
            service_needed: request.title.clone(),
            user_criteria: request.criteria.clone(),
            location: request.location.clone(),
            urgency: urgency_str(request.urgency).to_string(),
            provider_name: provider.name.clone(),
            provider_phone: provider.phone.clone(),
        };
        let context = DirectCallContext { provider_id, request_id };
        let cancel = self.cancel_map.register(&format!("booking:{request_id}"));
        let result = self.direct_caller.run_booking(&call_request, Some(context), cancel).await;
        self.cancel_map.remove(&format!("booking:{request_id}"));

        let fields = result
            .analysis
            .structured_data
            .as_ref()
            .map(parse_booking_confirmation)
            .unwrap_or_default();

        let mut updated = apply_call_result_to_provider(provider, &result);
        updated.booking_confirmed = Some(fields.confirmed);
        updated.booking_date = fields.date.clone();
        updated.booking_time = fields.time.clone();
        updated.confirmation_number = fields.confirmation_number.clone();
        let _ = self.repo.upsert_provider_call(provider_id, updated).await;

        vco_domain::trace::TraceEvent::BookingConfirmed {
            request_id: request_id.to_string(),
            confirmed: fields.confirmed,
        }
        .emit();

        if fields.confirmed {
            self.transition(request_id, RequestStatus::Completed).await?;
        } else {
            self.fail(request_id, "booking call did not yield a confirmed appointment").await;
        }

        Ok(())
    }

    async fn transition(&self, request_id: Uuid, to: RequestStatus) -> Result<()> {
        self.repo.update_request_status(request_id, to).await
    }

    async fn fail(&self, request_id: Uuid, reason: &str) {
        if let Err(e) = self.repo.update_request_status(request_id, RequestStatus::Failed).await {
            tracing::warn!(error = %e, request_id = %request_id, "failed to transition request to failed");
        }
        if let Err(e) = self.repo.set_final_outcome(request_id, reason.to_string()).await {
            tracing::warn!(error = %e, request_id = %request_id, "failed to record final outcome");
        }
    }
}

fn urgency_str(urgency: vco_domain::model::Urgency) -> &'static str {
    use vco_domain::model::Urgency::*;
    match urgency {
        Immediate => "immediate",
        Within24h => "within_24h",
        Within2d => "within_2d",
        Flexible => "flexible",
    }
}

/// Confirmation numbers are free text from a voice transcript — bounded to
/// 4-12 alphanumerics/dashes right after a "confirmation" cue word so an
/// unrelated number mentioned in conversation isn't mistaken for one.
fn confirmation_number_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bconf(?:irmation)?\s*(?:number|no\.?|#|code)?\s*[:\-]?\s*([A-Z0-9][A-Z0-9-]{2,11})\b")
            .expect("static regex is valid")
    })
}

fn parse_booking_confirmation(data: &StructuredCallData) -> BookingFields {
    let confirmed = data.all_criteria_met && !data.disqualified;

    let (date, time) = match &data.earliest_availability {
        Some(slot) => split_date_time(slot),
        None => (None, None),
    };

    let confirmation_number = data
        .notes
        .as_deref()
        .and_then(|notes| confirmation_number_regex().captures(notes))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    BookingFields {
        confirmed,
        date,
        time,
        confirmation_number,
    }
}

/// Splits a free-text availability slot like "Tomorrow 2pm" into a date
/// part and a time part. Best-effort: the last whitespace-delimited token
/// is treated as the time, everything before it as the date.
fn split_date_time(slot: &str) -> (Option<String>, Option<String>) {
    let slot = slot.trim();
    match slot.rsplit_once(char::is_whitespace) {
        Some((date, time)) if !date.is_empty() && !time.is_empty() => {
            (Some(date.to_string()), Some(time.to_string()))
        }
        _ => (Some(slot.to_string()), None),
    }
}
