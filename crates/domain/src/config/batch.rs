use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Batch calling concurrency
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls how many outbound calls a single `BatchCaller` run may have
/// in flight at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of concurrent `DirectCaller` tasks per batch.
    /// Clamped to the range `1..=10`.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl BatchConfig {
    /// Clamp `max_concurrent` to the allowed range `1..=10`.
    pub fn clamped(&self) -> Self {
        Self {
            max_concurrent: self.max_concurrent.clamp(1, 10),
        }
    }
}

fn default_max_concurrent() -> usize {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_concurrent_is_five() {
        assert_eq!(BatchConfig::default().max_concurrent, 5);
    }

    #[test]
    fn clamp_below_min() {
        let cfg = BatchConfig { max_concurrent: 0 };
        assert_eq!(cfg.clamped().max_concurrent, 1);
    }

    #[test]
    fn clamp_above_max() {
        let cfg = BatchConfig { max_concurrent: 100 };
        assert_eq!(cfg.clamped().max_concurrent, 10);
    }

    #[test]
    fn clamp_within_range() {
        let cfg = BatchConfig { max_concurrent: 7 };
        assert_eq!(cfg.clamped().max_concurrent, 7);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = BatchConfig { max_concurrent: 3 };
        let json = serde_json::to_string(&cfg).unwrap();
        let deserialized: BatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.max_concurrent, 3);
    }

    #[test]
    fn deserialize_missing_field_uses_default() {
        let cfg: BatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.max_concurrent, 5);
    }
}
