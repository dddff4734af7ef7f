use std::sync::Arc;

use vco_cache::Cache;
use vco_domain::config::Config;
use vco_orchestrator::{BatchCaller, CancelMap, DirectCaller, RequestOrchestrator, WebhookIngestor};
use vco_store::CallRepository;
use vco_vendor::VoiceVendorClient;

/// Everything an axum handler needs, cloned cheaply (every field is an
/// `Arc` or a `Clone`-able handle over one).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Cache,
    pub repo: Arc<dyn CallRepository>,
    pub vendor: Arc<dyn VoiceVendorClient>,
    pub direct_caller: Arc<DirectCaller>,
    pub batch_caller: Arc<BatchCaller>,
    pub webhook_ingestor: Arc<WebhookIngestor>,
    pub orchestrator: Arc<RequestOrchestrator>,
    pub cancel_map: Arc<CancelMap>,
    /// `None` in dev mode (no `api_token_env` value set) — every protected
    /// route is open. `Some` carries the SHA-256 digest of the configured
    /// bearer token, compared in constant time by `api::auth`.
    pub api_token_hash: Option<Vec<u8>>,
}
