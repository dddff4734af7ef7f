use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use vco_domain::error::{Error, Result};
use vco_domain::model::{
    allowed_transition, InteractionLog, Provider, RecommendationSet, RequestStatus, ServiceRequest,
};
use vco_domain::trace::TraceEvent;

use crate::{CallRepository, UpsertOutcome};

/// In-memory reference implementation of [`CallRepository`]. Mirrors the
/// uniqueness and idempotence invariants a SQL-backed store would enforce
/// so the same tests exercise the real contract either way.
pub struct InMemoryCallRepository {
    requests: RwLock<HashMap<Uuid, ServiceRequest>>,
    providers: RwLock<HashMap<Uuid, Provider>>,
    logs: RwLock<HashMap<Uuid, InteractionLog>>,
    seen_call_ids: RwLock<HashSet<String>>,
}

impl Default for InMemoryCallRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCallRepository {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            providers: RwLock::new(HashMap::new()),
            logs: RwLock::new(HashMap::new()),
            seen_call_ids: RwLock::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl CallRepository for InMemoryCallRepository {
    async fn insert_request(&self, request: ServiceRequest) -> Result<()> {
        self.requests.write().insert(request.id, request);
        Ok(())
    }

    async fn get_request(&self, request_id: Uuid) -> Result<Option<ServiceRequest>> {
        Ok(self.requests.read().get(&request_id).cloned())
    }

    async fn update_request_status(&self, request_id: Uuid, status: RequestStatus) -> Result<()> {
        let mut requests = self.requests.write();
        let request = requests
            .get_mut(&request_id)
            .ok_or_else(|| Error::Persistence(format!("no such request: {request_id}")))?;

        if !allowed_transition(request.status, status) {
            return Err(Error::InvalidTransition {
                from: format!("{:?}", request.status),
                to: format!("{:?}", status),
            });
        }

        let from = request.status;
        request.status = status;
        drop(requests);

        TraceEvent::RequestTransitioned {
            request_id: request_id.to_string(),
            from: format!("{from:?}"),
            to: format!("{status:?}"),
        }
        .emit();

        Ok(())
    }

    async fn save_recommendations(
        &self,
        request_id: Uuid,
        recommendations: RecommendationSet,
    ) -> Result<()> {
        let mut requests = self.requests.write();
        let request = requests
            .get_mut(&request_id)
            .ok_or_else(|| Error::Persistence(format!("no such request: {request_id}")))?;

        if !allowed_transition(request.status, RequestStatus::Recommended) {
            return Err(Error::InvalidTransition {
                from: format!("{:?}", request.status),
                to: "Recommended".into(),
            });
        }

        let candidate_count = recommendations.providers.len() + recommendations.excluded.len();
        let recommended_count = recommendations.providers.len();

        request.recommendations = Some(recommendations);
        request.status = RequestStatus::Recommended;
        drop(requests);

        TraceEvent::RecommendationsGenerated {
            request_id: request_id.to_string(),
            candidate_count,
            recommended_count,
        }
        .emit();

        Ok(())
    }

    async fn set_final_outcome(&self, request_id: Uuid, outcome: String) -> Result<()> {
        let mut requests = self.requests.write();
        let request = requests
            .get_mut(&request_id)
            .ok_or_else(|| Error::Persistence(format!("no such request: {request_id}")))?;
        request.final_outcome = Some(outcome);
        Ok(())
    }

    async fn insert_providers(&self, providers: Vec<Provider>) -> Result<()> {
        let mut guard = self.providers.write();
        for provider in providers {
            guard.insert(provider.id, provider);
        }
        Ok(())
    }

    async fn get_providers(&self, request_id: Uuid) -> Result<Vec<Provider>> {
        Ok(self
            .providers
            .read()
            .values()
            .filter(|p| p.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn get_provider(&self, provider_id: Uuid) -> Result<Option<Provider>> {
        Ok(self.providers.read().get(&provider_id).cloned())
    }

    async fn upsert_provider_call(
        &self,
        provider_id: Uuid,
        updated: Provider,
    ) -> Result<UpsertOutcome> {
        let mut guard = self.providers.write();
        let existing = guard
            .get(&provider_id)
            .ok_or_else(|| Error::Persistence(format!("no such provider: {provider_id}")))?;

        if existing.call_id.is_some() && existing.call_id == updated.call_id {
            return Ok(UpsertOutcome::AlreadyPresent);
        }

        let call_id = updated.call_id.clone();
        guard.insert(provider_id, updated);
        drop(guard);

        if let Some(call_id) = call_id {
            TraceEvent::RepositoryUpsert {
                call_id,
                provider_id: provider_id.to_string(),
                is_new: true,
            }
            .emit();
        }

        Ok(UpsertOutcome::Inserted)
    }

    async fn append_log(&self, log: InteractionLog) -> Result<UpsertOutcome> {
        if let Some(call_id) = &log.call_id {
            let mut seen = self.seen_call_ids.write();
            if !seen.insert(call_id.clone()) {
                return Ok(UpsertOutcome::AlreadyPresent);
            }
        }
        self.logs.write().insert(log.id, log);
        Ok(UpsertOutcome::Inserted)
    }

    async fn get_logs(&self, request_id: Uuid) -> Result<Vec<InteractionLog>> {
        let mut logs: Vec<InteractionLog> = self
            .logs
            .read()
            .values()
            .filter(|l| l.request_id == request_id)
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.timestamp);
        Ok(logs)
    }
}
