//! Cache inspection/eviction routes: `GET /vapi/calls/{callId}`,
//! `GET /vapi/cache/stats`, `DELETE /vapi/calls/{callId}`. See SPEC §6 and
//! §10.7 ("cache admin surface implemented against the real cache").

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::state::AppState;

/// `GET /vapi/calls/{callId}` — `{success, data: CallResult}` or 404 on a
/// cache miss/expiry (the expected outcome during normal polling, per §7).
pub async fn get_call(State(state): State<AppState>, Path(call_id): Path<String>) -> Response {
    match state.cache.get(&call_id).await {
        Some(entry) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "data": entry.result })),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "success": false, "error": "call not found or expired" })),
        )
            .into_response(),
    }
}

/// `DELETE /vapi/calls/{callId}` — evict a cache entry.
pub async fn evict_call(State(state): State<AppState>, Path(call_id): Path<String>) -> Response {
    let removed = state.cache.remove(&call_id).await;
    (StatusCode::OK, Json(serde_json::json!({ "success": true, "removed": removed }))).into_response()
}

/// `GET /vapi/cache/stats` — `{size, byStatus: map<dataStatus,int>}`.
pub async fn cache_stats(State(state): State<AppState>) -> Response {
    let stats = state.cache.stats().await;
    (StatusCode::OK, Json(stats)).into_response()
}
