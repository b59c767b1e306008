use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default = "d_20000u")]
    pub default_timeout_ms: u64,
    #[serde(default = "d_2")]
    pub max_retries: u32,
    /// Registered LLM providers. Exactly one concrete kind is supported
    /// (`openai_compat`) — this is a single-adapter transport, not a
    /// multi-provider fan-out or tiered router.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    #[serde(default)]
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    OpenaiCompat,
    AzureOpenai,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Env var holding the API key. Resolved once at provider construction —
    /// there is no key rotation, matching the one-key-per-model-entry
    /// semantics of the original configuration format.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (config-only setups; prefer `env`).
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    ApiKey,
    None,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_20000u() -> u64 {
    20_000
}
fn d_2() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_default_is_openai_compat() {
        assert_eq!(ProviderKind::default(), ProviderKind::OpenaiCompat);
    }

    #[test]
    fn auth_mode_default_is_api_key() {
        assert_eq!(AuthMode::default(), AuthMode::ApiKey);
    }

    #[test]
    fn llm_config_defaults() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.default_timeout_ms, 20_000);
        assert_eq!(cfg.max_retries, 2);
        assert!(cfg.providers.is_empty());
    }

    #[test]
    fn deserialize_provider_minimal() {
        let json = r#"{"id": "local", "base_url": "http://localhost:8000/v1"}"#;
        let p: ProviderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, "local");
        assert_eq!(p.kind, ProviderKind::OpenaiCompat);
        assert_eq!(p.auth.mode, AuthMode::ApiKey);
    }
}
