use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One scored, surfaced candidate. Produced by the recommender, persisted
/// verbatim alongside the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedProvider {
    pub provider_id: Uuid,
    pub name: String,
    pub phone: String,
    pub score: u8,
    pub rating: Option<f32>,
    pub review_count: Option<u32>,
    pub summary: Option<String>,
    pub earliest_availability: Option<String>,
    pub estimated_rate: Option<String>,
}

/// Why a candidate was excluded from the recommended set. Used to build
/// the human-readable explanation when the recommended list is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedProvider {
    pub provider_id: Uuid,
    pub name: String,
    pub reason: String,
}

/// The persisted output of one `Recommender` run for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub request_id: Uuid,
    pub providers: Vec<RecommendedProvider>,
    pub excluded: Vec<ExcludedProvider>,
    /// Human-readable summary, always populated — explains the ranking
    /// when non-empty, and explains *why nothing qualified* when empty.
    pub overall_recommendation: String,
}

impl RecommendationSet {
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
