//! Provider discovery is explicitly out of scope (§1) — this module only
//! owns the narrow seam `RequestOrchestrator` calls through, plus a
//! reference adapter with fixed results for tests and for a
//! single-process deployment with no real search backend wired in.

use async_trait::async_trait;

use vco_domain::error::Result;

/// One candidate surfaced by a search. Distinct from `Provider` because a
/// search result hasn't been assigned a store identity yet —
/// `RequestOrchestrator` is the one that turns these into `Provider` rows.
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    pub name: String,
    pub phone: String,
    pub rating: Option<f32>,
    pub review_count: Option<u32>,
    pub address: Option<String>,
    pub place_id: Option<String>,
    pub distance_miles: Option<f64>,
    pub hours: Option<String>,
    pub is_open_now: Option<bool>,
}

#[async_trait]
pub trait SearchAdapter: Send + Sync {
    async fn search(&self, service_needed: &str, location: &str) -> Result<Vec<SearchCandidate>>;
}

/// Returns a fixed candidate list regardless of query, keyed by
/// `service_needed`. Useful for local runs and as the default in tests
/// that don't care about discovery itself.
pub struct StaticSearchAdapter {
    candidates: Vec<SearchCandidate>,
}

impl StaticSearchAdapter {
    pub fn new(candidates: Vec<SearchCandidate>) -> Self {
        Self { candidates }
    }

    pub fn empty() -> Self {
        Self { candidates: vec![] }
    }
}

#[async_trait]
impl SearchAdapter for StaticSearchAdapter {
    async fn search(&self, _service_needed: &str, _location: &str) -> Result<Vec<SearchCandidate>> {
        Ok(self.candidates.clone())
    }
}
