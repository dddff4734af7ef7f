mod batch;
mod cache;
mod observability;
mod server;
mod vendor;

pub use batch::*;
pub use cache::*;
pub use observability::*;
pub use server::*;
pub use vendor::*;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vendor: VendorConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Layered load: built-in defaults, then `config.toml` in the current
    /// directory if present, then environment-variable overrides for the
    /// vendor connection (the only secrets that should never live on disk).
    pub fn load_or_default() -> Self {
        let mut config: Config = std::fs::read_to_string("config.toml")
            .ok()
            .and_then(|raw| toml::from_str(&raw).ok())
            .unwrap_or_default();

        Self::apply_env_overrides(&mut config);
        config
    }

    fn apply_env_overrides(config: &mut Config) {
        if let Ok(key) = std::env::var("VAPI_API_KEY") {
            if !key.is_empty() {
                config.vendor.api_key = Some(key);
            }
        }
        if let Ok(id) = std::env::var("VAPI_PHONE_NUMBER_ID") {
            if !id.is_empty() {
                config.vendor.phone_number_id = Some(id);
            }
        }
        if let Ok(url) = std::env::var("VAPI_WEBHOOK_URL") {
            if !url.is_empty() {
                config.vendor.webhook_url = Some(url);
            }
        }
        if let Ok(secret) = std::env::var("VAPI_WEBHOOK_SECRET") {
            if !secret.is_empty() {
                config.vendor.webhook_secret = Some(secret);
            }
        }
        if let Ok(url) = std::env::var("BACKEND_URL") {
            if !url.is_empty() {
                config.vendor.backend_url = url;
            }
        }
        if let Ok(raw) = std::env::var("VAPI_MAX_CONCURRENT_CALLS") {
            if let Ok(n) = raw.parse::<usize>() {
                config.batch.max_concurrent = n;
            }
        }
        if let Ok(raw) = std::env::var("TTL_SECONDS") {
            if let Ok(n) = raw.parse::<u64>() {
                config.cache.ttl_seconds = n;
            }
        }
        config.batch = config.batch.clamped();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.cache.ttl_seconds, 1800);
        assert_eq!(config.batch.max_concurrent, 5);
        assert!(config.vendor.api_key.is_none());
    }

    #[test]
    fn ttl_seconds_env_override_applies() {
        std::env::set_var("TTL_SECONDS", "900");
        let mut config = Config::default();
        Config::apply_env_overrides(&mut config);
        std::env::remove_var("TTL_SECONDS");
        assert_eq!(config.cache.ttl_seconds, 900);
    }

    #[test]
    fn explicit_toml_overrides_parse() {
        let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3210

[vendor]
base_url = "https://vendor.example.com"

[batch]
max_concurrent = 8
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.vendor.base_url, "https://vendor.example.com");
        assert_eq!(config.batch.max_concurrent, 8);
    }
}
