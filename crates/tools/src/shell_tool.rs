//! `shell_run`: the one illustrative high-risk tool, gated by an explicit
//! program allowlist (`ToolsConfig::shell_allowlist`).
//!
//! Never goes through a shell interpreter — `argv[0]` is execed directly via
//! [`tokio::process::Command`], so there is no shell metacharacter surface
//! to sanitize. Output is truncated with the same UTF-8-boundary-safe idiom
//! `contextpack` uses for context sections, against
//! `ToolsConfig::max_output_chars`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sa_domain::config::ToolsConfig;
use serde_json::Value;
use tokio::process::Command;

use crate::tool::{RiskLevel, Tool, ToolError};

/// Truncate `content` to `max_chars` bytes at a UTF-8 boundary, appending a
/// marker if anything was cut. Mirrors `contextpack::truncation::truncate_per_file`.
pub fn truncate(content: &str, max_chars: usize) -> (String, bool) {
    if content.len() <= max_chars {
        return (content.to_string(), false);
    }
    let boundary = content.floor_char_boundary(max_chars);
    let mut result = content[..boundary].to_string();
    result.push_str("\n\n[TRUNCATED]\n");
    (result, true)
}

pub struct ShellRunTool {
    config: Arc<ToolsConfig>,
    schema: Value,
}

impl ShellRunTool {
    pub fn new(config: Arc<ToolsConfig>) -> Self {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "program": {"type": "string"},
                "args": {"type": "array"},
            },
            "required": ["program"],
            "additionalProperties": false,
        });
        Self { config, schema }
    }
}

#[async_trait]
impl Tool for ShellRunTool {
    fn name(&self) -> &str {
        "shell_run"
    }
    fn description(&self) -> &str {
        "Run an allowlisted program (no shell interpreter) and capture its output."
    }
    fn parameters_schema(&self) -> &Value {
        &self.schema
    }
    fn risk_level(&self) -> RiskLevel {
        RiskLevel::High
    }

    async fn call(&self, params: Value) -> Result<Value, ToolError> {
        let program = params["program"].as_str().unwrap_or_default();
        if !self.config.shell_allowlist.iter().any(|p| p == program) {
            return Ok(serde_json::json!({
                "error": format!("program '{program}' is not in the shell allowlist"),
            }));
        }

        let args: Vec<String> = params
            .get("args")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .map(|v| v.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut command = Command::new(program);
        command.args(&args).kill_on_drop(true);

        let timeout = Duration::from_secs(self.config.shell_timeout_sec);
        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::Execution(format!(
                    "failed to run '{program}': {e}"
                )))
            }
            Err(_) => {
                return Ok(serde_json::json!({
                    "error": format!(
                        "'{program}' timed out after {}s",
                        self.config.shell_timeout_sec
                    ),
                }))
            }
        };

        let (stdout, stdout_truncated) = truncate(
            &String::from_utf8_lossy(&output.stdout),
            self.config.max_output_chars,
        );
        let (stderr, stderr_truncated) = truncate(
            &String::from_utf8_lossy(&output.stderr),
            self.config.max_output_chars,
        );

        Ok(serde_json::json!({
            "program": program,
            "args": args,
            "exit_code": output.status.code(),
            "stdout": stdout,
            "stderr": stderr,
            "stdout_truncated": stdout_truncated,
            "stderr_truncated": stderr_truncated,
        }))
    }
}
