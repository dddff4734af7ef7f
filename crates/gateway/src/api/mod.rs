pub mod auth;
pub mod calls;
pub mod providers;
pub mod requests;
pub mod webhooks;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

/// `GET /vapi/health` — liveness probe (ambient; §10.2).
async fn health() -> &'static str {
    "ok"
}

/// Builds the full router. Vendor-facing and read-only routes are public;
/// everything that dispatches a call, mutates a request, or evicts a
/// cache entry sits behind `auth::require_api_token`.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/vapi/health", get(health))
        .route("/vapi/webhook", post(webhooks::ingest))
        .route("/vapi/calls/:callId", get(calls::get_call))
        .route("/vapi/cache/stats", get(calls::cache_stats))
        .route("/providers/call/status", get(providers::call_status))
        .route("/requests/:id", get(requests::get));

    let protected = Router::new()
        .route("/vapi/calls/:callId", delete(calls::evict_call))
        .route("/providers/batch-call", post(providers::batch_call))
        .route("/providers/call", post(providers::single_call))
        .route("/requests", post(requests::create))
        .route("/requests/:id/select-provider", post(requests::select_provider))
        .route("/requests/:id/cancel", post(requests::cancel))
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_token));

    public
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
