use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Voice vendor connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection details for the outbound voice-call vendor.
///
/// `api_key` and `webhook_secret` are read from the environment
/// (`VAPI_API_KEY`, `VAPI_WEBHOOK_SECRET`) rather than committed to
/// `config.toml`; the fields here just hold whatever was resolved at
/// startup so the rest of the crate doesn't need to touch `std::env`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VendorConfig {
    /// Base URL of the vendor's REST API.
    #[serde(default = "d_base_url")]
    pub base_url: String,

    /// API key used to authenticate outbound calls. `None` disables the
    /// vendor client (dev/test mode — callers get a typed `Config` error
    /// before ever making a request).
    #[serde(default)]
    pub api_key: Option<String>,

    /// The vendor's outbound phone-number identifier used as the caller ID.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Publicly reachable URL the vendor should POST webhooks to.
    /// Presence toggles webhook mode in `DirectCaller`.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Shared secret used to verify `X-Vapi-Signature` on inbound webhooks.
    /// When `None`, signature verification is skipped (dev mode).
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Base URL `DirectCaller` polls when operating in webhook mode
    /// (its own gateway's `/vapi/calls/{id}` endpoint).
    #[serde(default = "d_backend_url")]
    pub backend_url: String,
}

impl VendorConfig {
    pub fn webhook_mode_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }
}

fn d_base_url() -> String {
    "https://api.vapi.ai".into()
}

fn d_backend_url() -> String {
    "http://127.0.0.1:3210".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_api_key() {
        assert!(VendorConfig::default().api_key.is_none());
    }

    #[test]
    fn default_webhook_mode_disabled() {
        assert!(!VendorConfig::default().webhook_mode_enabled());
    }

    #[test]
    fn webhook_mode_enabled_when_url_present() {
        let cfg = VendorConfig {
            webhook_url: Some("https://example.com/vapi/webhook".into()),
            ..Default::default()
        };
        assert!(cfg.webhook_mode_enabled());
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: VendorConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.base_url, "https://api.vapi.ai");
        assert_eq!(cfg.backend_url, "http://127.0.0.1:3210");
    }
}
