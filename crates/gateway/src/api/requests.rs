//! Service-request lifecycle routes.
//!
//! Not named explicitly in SPEC §6's external-interface list — that list
//! covers the vendor-facing and cache-admin surface. `RequestOrchestrator`
//! (§4.9) is still core functionality and needs *some* HTTP entrypoint to
//! drive a request from creation through booking, so this module adds the
//! ambient CRUD+action surface a caller needs to use it. See DESIGN.md.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use vco_domain::model::{PreferredContact, ServiceRequest, Urgency};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    title: String,
    description: String,
    #[serde(default)]
    criteria: Vec<String>,
    location: String,
    #[serde(default)]
    preferred_contact: PreferredContactInput,
    #[serde(default)]
    urgency: UrgencyInput,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PreferredContactInput {
    #[default]
    Phone,
    Text,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum UrgencyInput {
    Immediate,
    Within24h,
    Within2d,
    #[default]
    Flexible,
}

/// `POST /requests` — persists a `Pending` request and kicks off
/// discovery in the background; the caller polls `GET /requests/{id}`.
pub async fn create(State(state): State<AppState>, Json(body): Json<CreateRequestBody>) -> Response {
    let preferred_contact = match body.preferred_contact {
        PreferredContactInput::Phone => PreferredContact::Phone,
        PreferredContactInput::Text => PreferredContact::Text,
    };
    let urgency = match body.urgency {
        UrgencyInput::Immediate => Urgency::Immediate,
        UrgencyInput::Within24h => Urgency::Within24h,
        UrgencyInput::Within2d => Urgency::Within2d,
        UrgencyInput::Flexible => Urgency::Flexible,
    };

    let request = ServiceRequest::new(
        body.title,
        body.description,
        body.criteria,
        body.location,
        preferred_contact,
        urgency,
    );
    let request_id = request.id;

    if let Err(e) = state.repo.insert_request(request).await {
        return internal_error(&e.to_string());
    }

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run_discovery(request_id).await {
            tracing::warn!(error = %e, request_id = %request_id, "discovery run failed");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "success": true, "requestId": request_id })),
    )
        .into_response()
}

/// `GET /requests/{id}`
pub async fn get(State(state): State<AppState>, Path(request_id): Path<Uuid>) -> Response {
    match state.repo.get_request(request_id).await {
        Ok(Some(request)) => (StatusCode::OK, Json(serde_json::json!({ "success": true, "data": request })))
            .into_response(),
        Ok(None) => not_found(&format!("no such request: {request_id}")),
        Err(e) => internal_error(&e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectProviderBody {
    provider_id: Uuid,
}

/// `POST /requests/{id}/select-provider` — runs the booking call for the
/// chosen provider in the background.
pub async fn select_provider(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<SelectProviderBody>,
) -> Response {
    match state.repo.get_request(request_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(&format!("no such request: {request_id}")),
        Err(e) => return internal_error(&e.to_string()),
    }

    let orchestrator = state.orchestrator.clone();
    let provider_id = body.provider_id;
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run_booking(request_id, provider_id).await {
            tracing::warn!(error = %e, request_id = %request_id, "booking run failed");
        }
    });

    (StatusCode::ACCEPTED, Json(serde_json::json!({ "success": true }))).into_response()
}

/// `POST /requests/{id}/cancel` — signals the in-flight calling batch (if
/// any) to stop dispatching further calls. A no-op if the request isn't
/// currently in the `Calling`/`Booking` phase.
pub async fn cancel(State(state): State<AppState>, Path(request_id): Path<Uuid>) -> Response {
    let cancelled = state.cancel_map.cancel(&request_id.to_string())
        || state.cancel_map.cancel(&format!("booking:{request_id}"));

    (StatusCode::OK, Json(serde_json::json!({ "success": true, "cancelled": cancelled }))).into_response()
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
