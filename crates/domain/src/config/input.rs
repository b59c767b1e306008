use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Input size guards
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InputConfig {
    /// Hard ceiling on a single `read_file` result, in megabytes.
    #[serde(default = "d_max_file_size_mb")]
    pub max_file_size_mb: u64,
    /// Rough token-count ceiling (chars/4) for context assembled into a
    /// single invocation prompt.
    #[serde(default = "d_max_tokens_estimate")]
    pub max_tokens_estimate: usize,
    /// Files larger than this are summarized or truncated rather than
    /// injected verbatim.
    #[serde(default = "d_large_file_threshold_mb")]
    pub large_file_threshold_mb: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: d_max_file_size_mb(),
            max_tokens_estimate: d_max_tokens_estimate(),
            large_file_threshold_mb: d_large_file_threshold_mb(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_max_file_size_mb() -> u64 {
    10
}
fn d_max_tokens_estimate() -> usize {
    32_000
}
fn d_large_file_threshold_mb() -> u64 {
    1
}
