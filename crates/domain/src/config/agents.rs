use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Per-agent-type configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Configuration for one agent type (key = agent_type in the `agents` map).
///
/// An "agent type" selects a tool subset, an iteration cap, and a model
/// category; it has no relation to the sub-agent fan-out/delegation concept
/// this config shape once supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool names this agent type may call. `["*"]` or empty means all
    /// registered tools.
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// Hard cap on loop iterations, mirrored onto the invocation engine's
    /// default unless the caller overrides it explicitly.
    #[serde(default = "d_max_iterations")]
    pub max_iterations: u32,
    /// Risk levels that must go through the approval gate for this agent
    /// type, regardless of the tool's own declared risk level.
    #[serde(default = "d_approval_required_for")]
    pub approval_required_for: Vec<String>,
    /// Model category (see `ModelsConfig::categories`) this agent type uses
    /// when no explicit model is requested.
    #[serde(default = "d_model_key")]
    pub model_key: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            allowed_tools: Vec::new(),
            max_iterations: d_max_iterations(),
            approval_required_for: d_approval_required_for(),
            model_key: d_model_key(),
        }
    }
}

impl AgentConfig {
    /// True if `tool_name` is permitted for this agent type.
    pub fn allows_tool(&self, tool_name: &str) -> bool {
        self.allowed_tools.is_empty() || self.allowed_tools.iter().any(|t| t == "*" || t == tool_name)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_max_iterations() -> u32 {
    100
}
fn d_approval_required_for() -> Vec<String> {
    vec!["high".into()]
}
fn d_model_key() -> String {
    "default".into()
}
