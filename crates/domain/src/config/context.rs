use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context manager token budgets
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Token budgets for the three-tier project context (brief / summary / recent).
///
/// Token counts are the cheap `chars / 4` approximation — see
/// `sa_store::context::approx_tokens`. Not a real tokenizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Budget for the recent-history window before `maybe_summarise` compacts it.
    #[serde(default = "d_recent_buffer")]
    pub recent_buffer_tokens: usize,
    /// Soft cap the summariser is asked to keep the rolling summary under.
    #[serde(default = "d_summary")]
    pub summary_tokens: usize,
    /// Soft cap applied to the human-authored brief when assembling context.
    #[serde(default = "d_brief")]
    pub brief_tokens: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            recent_buffer_tokens: d_recent_buffer(),
            summary_tokens: d_summary(),
            brief_tokens: d_brief(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_recent_buffer() -> usize {
    4_000
}
fn d_summary() -> usize {
    1_500
}
fn d_brief() -> usize {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_semantics() {
        let cfg = ContextConfig::default();
        assert_eq!(cfg.recent_buffer_tokens, 4_000);
        assert!(cfg.summary_tokens < cfg.recent_buffer_tokens);
        assert!(cfg.brief_tokens < cfg.summary_tokens);
    }

    #[test]
    fn deserialize_missing_fields_uses_defaults() {
        let cfg: ContextConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.recent_buffer_tokens, 4_000);
    }
}
