//! `/providers/*` routes: ad-hoc calling that bypasses the persisted
//! `ServiceRequest` lifecycle — these exist for callers who already know
//! which providers to dial and just want `CallResult`s back, without
//! driving the §4.9 state machine. See SPEC §6.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use vco_domain::model::{PreferredContact, Provider, ServiceRequest, Urgency};
use vco_orchestrator::batch_caller::BatchItem;
use vco_orchestrator::DirectCallContext;
use vco_vendor::CallRequest;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProviderInput {
    name: String,
    phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCallRequest {
    providers: Vec<ProviderInput>,
    service_needed: String,
    #[serde(default)]
    user_criteria: Vec<String>,
    location: String,
    #[serde(default = "default_urgency")]
    urgency: String,
    max_concurrent: Option<usize>,
    service_request_id: Option<Uuid>,
}

fn default_urgency() -> String {
    "flexible".into()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleCallRequest {
    provider: ProviderInput,
    service_needed: String,
    #[serde(default)]
    user_criteria: Vec<String>,
    location: String,
    #[serde(default = "default_urgency")]
    urgency: String,
    service_request_id: Option<Uuid>,
}

/// Looks up `service_request_id` if given, otherwise persists a
/// throwaway `ServiceRequest` so every ad-hoc call still has the stored
/// `(provider, request)` rows `DirectCaller`/`BatchCaller` correlate
/// webhooks and persistence against.
async fn ensure_request(
    state: &AppState,
    existing: Option<Uuid>,
    service_needed: &str,
    location: &str,
) -> Result<Uuid, Response> {
    if let Some(id) = existing {
        return match state.repo.get_request(id).await {
            Ok(Some(_)) => Ok(id),
            Ok(None) => Err(not_found(&format!("no such service request: {id}"))),
            Err(e) => Err(internal_error(&e.to_string())),
        };
    }

    let request = ServiceRequest::new(
        service_needed,
        service_needed,
        Vec::new(),
        location,
        PreferredContact::Phone,
        Urgency::Flexible,
    );
    let request_id = request.id;
    state
        .repo
        .insert_request(request)
        .await
        .map_err(|e| internal_error(&e.to_string()))?;
    Ok(request_id)
}

async fn insert_provider(state: &AppState, request_id: Uuid, input: &ProviderInput) -> Result<Uuid, Response> {
    let provider = Provider::new(request_id, input.name.clone(), input.phone.clone());
    let provider_id = provider.id;
    state
        .repo
        .insert_providers(vec![provider])
        .await
        .map_err(|e| internal_error(&e.to_string()))?;
    Ok(provider_id)
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "success": false, "error": message }))).into_response()
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}

/// `POST /providers/batch-call`
pub async fn batch_call(State(state): State<AppState>, Json(body): Json<BatchCallRequest>) -> Response {
    let request_id = match ensure_request(&state, body.service_request_id, &body.service_needed, &body.location).await
    {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut items = Vec::with_capacity(body.providers.len());
    for provider in &body.providers {
        let provider_id = match insert_provider(&state, request_id, provider).await {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        items.push(BatchItem {
            context: DirectCallContext { provider_id, request_id },
            request: CallRequest {
                service_needed: body.service_needed.clone(),
                user_criteria: body.user_criteria.clone(),
                location: body.location.clone(),
                urgency: body.urgency.clone(),
                provider_name: provider.name.clone(),
                provider_phone: provider.phone.clone(),
            },
        });
    }

    let max_concurrent = body
        .max_concurrent
        .unwrap_or(state.config.batch.max_concurrent)
        .clamp(1, 10);
    let cancel = vco_orchestrator::CancelToken::new();
    let outcome = state.batch_caller.run(items, max_concurrent, cancel).await;

    (StatusCode::OK, Json(serde_json::json!({ "success": true, "results": outcome.results }))).into_response()
}

/// `POST /providers/call` — single-call equivalent of `batch_call`.
pub async fn single_call(State(state): State<AppState>, Json(body): Json<SingleCallRequest>) -> Response {
    let request_id = match ensure_request(&state, body.service_request_id, &body.service_needed, &body.location).await
    {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let provider_id = match insert_provider(&state, request_id, &body.provider).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let call_request = CallRequest {
        service_needed: body.service_needed,
        user_criteria: body.user_criteria,
        location: body.location,
        urgency: body.urgency,
        provider_name: body.provider.name,
        provider_phone: body.provider.phone,
    };
    let context = DirectCallContext { provider_id, request_id };
    let result = state
        .direct_caller
        .run(&call_request, Some(context), vco_orchestrator::CancelToken::new())
        .await;

    (StatusCode::OK, Json(serde_json::json!({ "success": true, "data": result }))).into_response()
}

/// `GET /providers/call/status`
pub async fn call_status(State(state): State<AppState>) -> Response {
    let vendor = &state.config.vendor;
    let webhook_enabled = vendor.webhook_mode_enabled();
    let vapi_configured = vendor.api_key.is_some() && vendor.phone_number_id.is_some();
    let active_method = if webhook_enabled { "webhook" } else { "polling" };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "webhookEnabled": webhook_enabled,
            "vapiConfigured": vapi_configured,
            "activeMethod": active_method,
        })),
    )
        .into_response()
}
