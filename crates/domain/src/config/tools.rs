use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Illustrative tool configuration (shell allowlist)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Configuration for the built-in illustrative tools.
///
/// Real tool implementations are out of scope; these exist only to exercise
/// the registry, schema validation, and approval gate end to end. Filesystem
/// access is scoped separately via `paths.allowed_read`/`paths.allowed_write`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Program names (argv[0], no path component) `shell_run` may invoke.
    /// `shell_run` never invokes a shell interpreter — it execs the program
    /// directly with an explicit argv array.
    #[serde(default = "d_shell_allowlist")]
    pub shell_allowlist: Vec<String>,
    /// Hard wall-clock timeout for `shell_run` invocations (seconds).
    #[serde(default = "d_shell_timeout")]
    pub shell_timeout_sec: u64,
    /// Max output chars captured per tool execution before truncation.
    #[serde(default = "d_max_output_chars")]
    pub max_output_chars: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            shell_allowlist: d_shell_allowlist(),
            shell_timeout_sec: d_shell_timeout(),
            max_output_chars: d_max_output_chars(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_shell_allowlist() -> Vec<String> {
    vec!["echo".into(), "ls".into(), "cat".into()]
}
fn d_shell_timeout() -> u64 {
    30
}
fn d_max_output_chars() -> usize {
    200_000
}
