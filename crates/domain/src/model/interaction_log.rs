use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::call::TranscriptLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Warning,
    Error,
    Info,
}

/// An append-only record of something that happened while working a
/// request: a search, a call dispatch, an enrichment retry, a state
/// transition. Deduplicated on `call_id` by the repository so that the
/// webhook path and the polling path can both log the same call without
/// producing two rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionLog {
    pub id: Uuid,
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub step_name: String,
    pub detail: String,
    pub status: LogStatus,
    #[serde(default)]
    pub transcript: Vec<TranscriptLine>,
    pub provider_id: Option<Uuid>,
    pub call_id: Option<String>,
}

impl InteractionLog {
    pub fn new(
        request_id: Uuid,
        step_name: impl Into<String>,
        detail: impl Into<String>,
        status: LogStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            timestamp: Utc::now(),
            step_name: step_name.into(),
            detail: detail.into(),
            status,
            transcript: vec![],
            provider_id: None,
            call_id: None,
        }
    }

    pub fn with_call(mut self, provider_id: Uuid, call_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id);
        self.call_id = Some(call_id.into());
        self
    }
}
