//! In-memory TTL cache for in-flight and recently-completed call results.
//!
//! A call's result can arrive via a vendor webhook (fast, partial) and
//! later be completed by background enrichment, or via direct polling.
//! This cache is the single point where both paths converge: the webhook
//! path calls `set`, the enrichment path calls `merge`, and anything
//! polling the gateway's own `/vapi/calls/{id}` route calls `get`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use vco_domain::model::{CachedEntry, CallResult, DataStatus};

#[derive(Clone)]
pub struct Cache {
    entries: Arc<RwLock<HashMap<String, CachedEntry>>>,
    ttl: Duration,
    reap_interval: Duration,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub by_status: HashMap<String, usize>,
}

impl Cache {
    pub fn new(ttl: Duration, reap_interval: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            reap_interval,
        }
    }

    /// Store (or replace) the result for `call_id`. The entry's expiry is
    /// reset to `now + ttl` on every `set`, regardless of whether one
    /// already existed.
    pub async fn set(&self, call_id: &str, result: CallResult, data_status: DataStatus) {
        let now = Utc::now();
        let entry = CachedEntry {
            result,
            data_status,
            webhook_received_at: Some(now),
            fetched_at: None,
            expires_at: now + chrono::Duration::from_std(self.ttl).unwrap_or_default(),
        };
        self.entries.write().await.insert(call_id.to_string(), entry);
    }

    /// Returns `None` if the entry is absent or has expired. An expired
    /// entry is treated as a miss but is not evicted here — the reaper
    /// owns removal so reads stay lock-cheap.
    pub async fn get(&self, call_id: &str) -> Option<CachedEntry> {
        let guard = self.entries.read().await;
        let entry = guard.get(call_id)?;
        if entry.is_expired(Utc::now()) {
            return None;
        }
        Some(entry.clone())
    }

    /// Updates the enrichment status in place. No-op if the entry is
    /// absent (it may have expired or never existed).
    pub async fn update_fetch_status(&self, call_id: &str, status: DataStatus) {
        if let Some(entry) = self.entries.write().await.get_mut(call_id) {
            entry.data_status = status;
        }
    }

    /// Merges enriched vendor data into the existing partial entry.
    /// No-op if the entry is absent — enrichment always follows a prior
    /// `set` from the webhook path, so an absent entry means it expired
    /// or was evicted before enrichment completed.
    pub async fn merge(&self, call_id: &str, enriched: CallResult) {
        let mut guard = self.entries.write().await;
        if let Some(entry) = guard.get_mut(call_id) {
            entry.result.merge(enriched);
            entry.data_status = DataStatus::Complete;
            entry.fetched_at = Some(Utc::now());
        }
    }

    pub async fn remove(&self, call_id: &str) -> bool {
        self.entries.write().await.remove(call_id).is_some()
    }

    pub async fn stats(&self) -> CacheStats {
        let guard = self.entries.read().await;
        let mut by_status: HashMap<String, usize> = HashMap::new();
        for entry in guard.values() {
            let key = match entry.data_status {
                DataStatus::Partial => "partial",
                DataStatus::Fetching => "fetching",
                DataStatus::Complete => "complete",
                DataStatus::FetchFailed => "fetch_failed",
            };
            *by_status.entry(key.to_string()).or_insert(0) += 1;
        }
        CacheStats {
            size: guard.len(),
            by_status,
        }
    }

    /// Spawns a background task that periodically evicts expired entries.
    /// Each sweep interval is jittered by up to 10% so that many `Cache`
    /// instances in a process don't all wake in lockstep.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(cache.jittered_interval()).await;
                cache.reap_once().await;
            }
        })
    }

    async fn reap_once(&self) {
        let now = Utc::now();
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|_, entry| !entry.is_expired(now));
        let evicted = before - guard.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = guard.len(), "cache reaper evicted expired entries");
        }
    }

    fn jittered_interval(&self) -> Duration {
        let base = self.reap_interval;
        let max_jitter = base.mul_f64(0.1);
        if max_jitter.is_zero() {
            return base;
        }
        let jitter = rand::rng().random_range(0.0..=max_jitter.as_secs_f64());
        base + Duration::from_secs_f64(jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vco_domain::model::{CallAnalysis, CallMethod, CallStatus};

    fn sample_result(call_id: &str, transcript: &str) -> CallResult {
        CallResult {
            call_id: call_id.to_string(),
            status: CallStatus::InProgress,
            call_method: CallMethod::Webhook,
            duration_minutes: None,
            ended_reason: None,
            transcript: Some(transcript.to_string()),
            transcript_lines: vec![],
            analysis: CallAnalysis::default(),
            cost: None,
            provider_id: Some("p1".into()),
            service_request_id: Some("r1".into()),
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = Cache::new(Duration::from_secs(60), Duration::from_secs(5));
        cache.set("c1", sample_result("c1", "hello"), DataStatus::Partial).await;
        let entry = cache.get("c1").await.unwrap();
        assert_eq!(entry.result.transcript.unwrap(), "hello");
        assert_eq!(entry.data_status, DataStatus::Partial);
    }

    #[tokio::test]
    async fn get_returns_none_for_missing_entry() {
        let cache = Cache::new(Duration::from_secs(60), Duration::from_secs(5));
        assert!(cache.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_not_returned() {
        let cache = Cache::new(Duration::from_millis(1), Duration::from_secs(5));
        cache.set("c1", sample_result("c1", "hi"), DataStatus::Partial).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get("c1").await.is_none());
    }

    #[tokio::test]
    async fn merge_prefers_longer_transcript_and_marks_complete() {
        let cache = Cache::new(Duration::from_secs(60), Duration::from_secs(5));
        cache.set("c1", sample_result("c1", "short"), DataStatus::Partial).await;
        let mut enriched = sample_result("c1", "a much longer enriched transcript");
        enriched.status = CallStatus::Completed;
        cache.merge("c1", enriched).await;
        let entry = cache.get("c1").await.unwrap();
        assert_eq!(entry.data_status, DataStatus::Complete);
        assert_eq!(entry.result.transcript.unwrap(), "a much longer enriched transcript");
        assert!(entry.fetched_at.is_some());
    }

    #[tokio::test]
    async fn merge_on_missing_entry_is_a_noop() {
        let cache = Cache::new(Duration::from_secs(60), Duration::from_secs(5));
        cache.merge("missing", sample_result("missing", "x")).await;
        assert!(cache.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn update_fetch_status_on_missing_entry_is_a_noop() {
        let cache = Cache::new(Duration::from_secs(60), Duration::from_secs(5));
        cache.update_fetch_status("missing", DataStatus::FetchFailed).await;
    }

    #[tokio::test]
    async fn stats_counts_by_status() {
        let cache = Cache::new(Duration::from_secs(60), Duration::from_secs(5));
        cache.set("c1", sample_result("c1", "a"), DataStatus::Partial).await;
        cache.set("c2", sample_result("c2", "b"), DataStatus::Complete).await;
        let stats = cache.stats().await;
        assert_eq!(stats.size, 2);
        assert_eq!(stats.by_status.get("partial"), Some(&1));
        assert_eq!(stats.by_status.get("complete"), Some(&1));
    }

    #[tokio::test]
    async fn remove_evicts_entry() {
        let cache = Cache::new(Duration::from_secs(60), Duration::from_secs(5));
        cache.set("c1", sample_result("c1", "a"), DataStatus::Partial).await;
        assert!(cache.remove("c1").await);
        assert!(cache.get("c1").await.is_none());
        assert!(!cache.remove("c1").await);
    }
}
