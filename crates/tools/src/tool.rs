//! The `Tool` trait: a descriptor plus a validate-then-dispatch contract.
//!
//! Ported from the original `Tool` dataclass (`tools/registry.py`): a tool
//! carries its own JSON-Schema-subset parameter schema and risk level, and
//! `execute` validates parameters against that schema before ever calling
//! into the tool's own logic. Validation failure returns an `{"error": ...}`
//! value rather than an `Err` — only the callable itself failing is an
//! execution error, since a validation failure is a normal, expected
//! outcome that gets fed back to the model as a tool-result message.

use async_trait::async_trait;
use serde_json::Value;

use crate::schema;

/// How much human oversight a tool call requires before it may run.
///
/// Stored on `tool_calls.risk_level` as the lowercase variant name. `Unknown`
/// covers tools that decline to self-classify; the approval gate (C7) treats
/// it the same as `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Unknown => "unknown",
        }
    }
}

/// An error raised by a tool's own execution logic, as opposed to a
/// parameter validation failure (which `execute` turns into an `{"error"}`
/// value instead of a `ToolError`).
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    Execution(String),
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON-Schema-subset describing accepted parameters. See [`schema`].
    fn parameters_schema(&self) -> &Value;
    fn risk_level(&self) -> RiskLevel;

    /// Run against already-validated parameters. Implementors never see
    /// parameters that failed [`schema::validate`].
    async fn call(&self, params: Value) -> Result<Value, ToolError>;

    /// Validate `params` against [`Tool::parameters_schema`] and dispatch to
    /// [`Tool::call`]. Tools should not override this.
    async fn execute(&self, params: Value) -> Result<Value, ToolError> {
        if let Err(message) = schema::validate(self.parameters_schema(), &params) {
            return Ok(serde_json::json!({
                "error": format!("Parameter validation failed: {message}"),
            }));
        }
        self.call(params).await
    }
}
