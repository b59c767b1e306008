mod agents;
mod context;
mod input;
mod llm;
mod logging;
mod models;
mod network;
mod paths;
mod projects;
mod tools;

pub use agents::*;
pub use context::*;
pub use input::*;
pub use llm::*;
pub use logging::*;
pub use models::*;
pub use network::*;
pub use paths::*;
pub use projects::*;
pub use tools::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    /// Agent type definitions (key = agent_type).
    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub projects: ProjectsConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good. Checked at startup
    /// before the supervisor initializes anything.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.network.enabled && self.network.tcp.port == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "network.tcp.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.network.require_auth && self.network.api_key.as_deref().unwrap_or("").is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "network.api_key".into(),
                message: "require_auth is set but no api_key is configured".into(),
            });
        }

        if self.llm.providers.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "llm.providers".into(),
                message: "no LLM providers configured; invocations will fail".into(),
            });
        }

        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            }
            if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://")
            {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: format!(
                        "base_url must start with http:// or https:// (got \"{}\")",
                        provider.base_url
                    ),
                });
            }
        }

        if self.models.list.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "models.list".into(),
                message: "no models configured".into(),
            });
        }
        if self.models.resolve(&self.models.default).is_none() && !self.models.list.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "models.default".into(),
                message: format!(
                    "default model key \"{}\" does not resolve to any entry in models.list",
                    self.models.default
                ),
            });
        }

        for (agent_type, agent) in &self.agents {
            if agent.max_iterations == 0 {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: format!("agents.{agent_type}.max_iterations"),
                    message: "max_iterations must be greater than 0".into(),
                });
            }
        }

        if self.context.recent_buffer_tokens == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "context.recent_buffer_tokens".into(),
                message: "recent_buffer_tokens must be greater than 0".into(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_only_warnings() {
        let cfg = Config::default();
        let issues = cfg.validate();
        assert!(
            issues.iter().all(|i| i.severity == ConfigSeverity::Warning),
            "unexpected errors in default config: {issues:?}"
        );
    }

    #[test]
    fn require_auth_without_key_is_error() {
        let mut cfg = Config::default();
        cfg.network.require_auth = true;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "network.api_key" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn zero_port_is_error() {
        let mut cfg = Config::default();
        cfg.network.tcp.port = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "network.tcp.port" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn invalid_provider_base_url_is_error() {
        let mut cfg = Config::default();
        cfg.llm.providers.push(ProviderConfig {
            id: "local".into(),
            kind: ProviderKind::OpenaiCompat,
            base_url: "ftp://bad".into(),
            auth: AuthConfig::default(),
            default_model: None,
        });
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "llm.providers[0].base_url" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn unresolvable_default_model_is_error() {
        let mut cfg = Config::default();
        cfg.models.list.push(ModelEntry {
            name: "local".into(),
            model: "qwen".into(),
            api_key_env: None,
            max_tokens: None,
        });
        cfg.models.default = "missing-category".into();
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "models.default" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn toml_roundtrip_defaults() {
        let cfg = Config::default();
        let serialized = toml::to_string(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&serialized).expect("parse");
        assert_eq!(parsed.network.tcp.port, cfg.network.tcp.port);
    }
}
