//! `CallRepository`: the persistence boundary for service requests,
//! providers, and their interaction logs.
//!
//! The trait is the seam a real deployment substitutes a durable store
//! behind (Postgres, Redis, whatever); [`InMemoryCallRepository`] is the
//! reference implementation used by the gateway binary when no external
//! store is configured, and by this crate's own tests.

mod memory;

pub use memory::InMemoryCallRepository;

use async_trait::async_trait;
use uuid::Uuid;

use vco_domain::error::Result;
use vco_domain::model::{
    InteractionLog, Provider, RecommendationSet, RequestStatus, ServiceRequest,
};

/// Outcome of an upsert — lets callers log "first time we saw this call"
/// vs. "duplicate observation" without a second read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyPresent,
}

#[async_trait]
pub trait CallRepository: Send + Sync {
    async fn insert_request(&self, request: ServiceRequest) -> Result<()>;

    async fn get_request(&self, request_id: Uuid) -> Result<Option<ServiceRequest>>;

    /// Validated against the `RequestStatus` DAG; a backward or otherwise
    /// illegal transition returns `Error::InvalidTransition` and leaves
    /// the stored status untouched.
    async fn update_request_status(&self, request_id: Uuid, status: RequestStatus) -> Result<()>;

    /// Persists the recommendation blob and transitions the request to
    /// `Recommended` atomically.
    async fn save_recommendations(
        &self,
        request_id: Uuid,
        recommendations: RecommendationSet,
    ) -> Result<()>;

    /// Records the human-readable explanation a `Failed` (or otherwise
    /// terminal) request carries. Independent of `update_request_status`
    /// since a request can fail for reasons discovered after the status
    /// write already happened (e.g. a drained batch with no survivors).
    async fn set_final_outcome(&self, request_id: Uuid, outcome: String) -> Result<()>;

    async fn insert_providers(&self, providers: Vec<Provider>) -> Result<()>;

    async fn get_providers(&self, request_id: Uuid) -> Result<Vec<Provider>>;

    async fn get_provider(&self, provider_id: Uuid) -> Result<Option<Provider>>;

    /// Writes the call_* and booking_* fields onto the provider row.
    /// Idempotent: if the stored row already carries this exact `call_id`,
    /// the write is skipped and `UpsertOutcome::AlreadyPresent` is
    /// returned instead of silently duplicating work.
    async fn upsert_provider_call(
        &self,
        provider_id: Uuid,
        updated: Provider,
    ) -> Result<UpsertOutcome>;

    /// Inserts a log entry. A duplicate `call_id` (when `Some`) is
    /// dropped silently — this is what lets the webhook path and the
    /// polling path both log the same call without double-logging.
    async fn append_log(&self, log: InteractionLog) -> Result<UpsertOutcome>;

    async fn get_logs(&self, request_id: Uuid) -> Result<Vec<InteractionLog>>;
}
