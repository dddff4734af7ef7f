use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use sha2::{Digest, Sha256};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use vco_cache::Cache;
use vco_domain::config::{Config, CorsConfig};
use vco_domain::error::{Error, Result as VcoResult};
use vco_orchestrator::batch_caller::BatchCaller;
use vco_orchestrator::cancel::CancelMap;
use vco_orchestrator::direct_caller::DirectCaller;
use vco_orchestrator::enricher::Enricher;
use vco_orchestrator::request_orchestrator::RequestOrchestrator;
use vco_orchestrator::search::{SearchAdapter, StaticSearchAdapter};
use vco_orchestrator::webhook_ingestor::WebhookIngestor;
use vco_store::InMemoryCallRepository;
use vco_vendor::{
    AssistantConfig, HttpVendorClient, StartedCall, VendorEvent, VoiceVendorClient,
};

use vco_gateway::api;
use vco_gateway::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "vco-gateway", version, about = "Voice call orchestrator gateway")]
struct Cli {
    /// Run without binding a listener; just validate config and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Arc::new(Config::load_or_default());
    if cli.check_config {
        println!("config OK: {config:#?}");
        return Ok(());
    }

    run_server(config).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,vco_gateway=debug")),
        )
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("call orchestrator gateway starting");

    let vendor: Arc<dyn VoiceVendorClient> = match HttpVendorClient::from_config(&config.vendor) {
        Ok(client) => {
            tracing::info!("vendor client configured against {}", config.vendor.base_url);
            Arc::new(client)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "vendor not fully configured (VAPI_API_KEY / VAPI_PHONE_NUMBER_ID) — \
                 outbound calls will fail until it is; cache and health routes still work"
            );
            Arc::new(UnconfiguredVendorClient)
        }
    };

    let cache = Cache::new(
        std::time::Duration::from_secs(config.cache.ttl_seconds),
        std::time::Duration::from_secs(config.cache.reap_interval_seconds),
    );
    cache.spawn_reaper();
    tracing::info!(ttl_seconds = config.cache.ttl_seconds, "call result cache ready");

    let repo: Arc<dyn vco_store::CallRepository> = Arc::new(InMemoryCallRepository::new());

    let webhook_url = config.vendor.webhook_url.clone();
    let direct_caller = Arc::new(DirectCaller::new(vendor.clone(), cache.clone(), repo.clone(), webhook_url));
    let batch_caller = Arc::new(BatchCaller::new(direct_caller.clone()));

    let enricher = Arc::new(Enricher::new(vendor.clone(), cache.clone(), repo.clone()));
    let webhook_ingestor = Arc::new(WebhookIngestor::new(vendor.clone(), cache.clone(), enricher));

    let search: Arc<dyn SearchAdapter> = Arc::new(StaticSearchAdapter::empty());
    let cancel_map = Arc::new(CancelMap::new());
    let orchestrator = Arc::new(RequestOrchestrator::new(
        search,
        batch_caller.clone(),
        direct_caller.clone(),
        repo.clone(),
        cancel_map.clone(),
        config.batch.max_concurrent,
    ));

    let api_token_hash = {
        let env_var = &config.server.api_token_env;
        match std::env::var(env_var) {
            Ok(token) if !token.is_empty() => {
                tracing::info!(env_var = %env_var, "API bearer-token auth enabled");
                Some(Sha256::digest(token.as_bytes()).to_vec())
            }
            _ => {
                tracing::warn!(env_var = %env_var, "API bearer-token auth DISABLED — set {env_var} to enable");
                None
            }
        }
    };

    let state = AppState {
        config: config.clone(),
        cache,
        repo,
        vendor,
        direct_caller,
        batch_caller,
        webhook_ingestor,
        orchestrator,
        cancel_map,
        api_token_hash,
    };

    let cors_layer = build_cors_layer(&config.server.cors);
    let app = api::router(state.clone()).layer(cors_layer).with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "gateway listening");

    axum::serve(listener, app).await.context("axum server error")?;
    Ok(())
}

/// Build a [`CorsLayer`] from the configured allowed origins. A literal
/// `"*"` entry allows all origins (dev only — incompatible with
/// credentials). Otherwise only the listed exact origins are allowed.
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    use axum::http::header;

    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "invalid CORS origin, skipping");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Stand-in `VoiceVendorClient` used when `VAPI_API_KEY`/
/// `VAPI_PHONE_NUMBER_ID` aren't set. Every call-placing method returns a
/// typed `Error::Config` instead of panicking or silently no-opping, so
/// the failure surfaces cleanly at the route that tried to place a call
/// rather than at startup — startup still needs to succeed so the
/// cache/health surface works in a dev environment with no vendor creds.
struct UnconfiguredVendorClient;

#[async_trait]
impl VoiceVendorClient for UnconfiguredVendorClient {
    async fn start_call(
        &self,
        _customer_number: &str,
        _customer_name: &str,
        _assistant: AssistantConfig,
        _metadata: Option<std::collections::HashMap<String, String>>,
    ) -> VcoResult<StartedCall> {
        Err(Error::Config("vendor is not configured (missing VAPI_API_KEY/VAPI_PHONE_NUMBER_ID)".into()))
    }

    async fn get_call(&self, _call_id: &str) -> VcoResult<vco_vendor::VendorCall> {
        Err(Error::Config("vendor is not configured (missing VAPI_API_KEY/VAPI_PHONE_NUMBER_ID)".into()))
    }

    fn parse_webhook(&self, _body: &[u8]) -> VcoResult<VendorEvent> {
        Err(Error::Config("vendor is not configured, cannot parse webhook".into()))
    }
}
