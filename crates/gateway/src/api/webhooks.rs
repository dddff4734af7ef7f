//! `POST /vapi/webhook` — vendor end-of-call event ingestion.
//!
//! When `config.vendor.webhook_secret` is set, the body's HMAC-SHA256
//! signature is checked against `X-Vapi-Signature` before the payload is
//! handed to the `WebhookIngestor`. Per SPEC §4.6/§7, this route always
//! acks with 200 for anything short of a bad signature — a malformed or
//! uninteresting body is a no-op, not a 4xx, since a 4xx would make the
//! vendor retry an event that will never parse any differently.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use vco_orchestrator::IngestOutcome;

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// `POST /vapi/webhook`
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.config.vendor.webhook_secret {
        let sig_header = headers
            .get("x-vapi-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(&body);
        let computed = hex::encode(mac.finalize().into_bytes());

        if computed.as_bytes().ct_eq(sig_header.as_bytes()).unwrap_u8() != 1 {
            tracing::warn!("webhook signature mismatch, rejecting");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid webhook signature" })),
            )
                .into_response();
        }
    }

    let outcome = state.webhook_ingestor.handle(&body).await;
    let body = match &outcome {
        IngestOutcome::Ingested { call_id } => {
            serde_json::json!({ "success": true, "callId": call_id })
        }
        IngestOutcome::Ignored { event_type } => {
            serde_json::json!({ "success": true, "ignored": event_type })
        }
        IngestOutcome::Malformed { reason } => {
            serde_json::json!({ "success": true, "warning": reason })
        }
    };

    (StatusCode::OK, Json(body)).into_response()
}
