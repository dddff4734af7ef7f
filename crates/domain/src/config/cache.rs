use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Call-result cache
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds before `Get` treats it as expired.
    #[serde(default = "d_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Interval between reaper sweeps that evict expired entries.
    #[serde(default = "d_reap_interval_seconds")]
    pub reap_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: d_ttl_seconds(),
            reap_interval_seconds: d_reap_interval_seconds(),
        }
    }
}

fn d_ttl_seconds() -> u64 {
    1800
}

fn d_reap_interval_seconds() -> u64 {
    300
}
