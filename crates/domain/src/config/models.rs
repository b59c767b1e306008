use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model selection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Flat model list plus named categories, resolved by `select_model`.
///
/// There is no tiered classifier or pricing-based router here — a
/// `model_key` is either a category name or a direct entry name, looked up
/// against `list`/`categories` in that order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelsConfig {
    #[serde(default)]
    pub list: Vec<ModelEntry>,
    #[serde(default)]
    pub categories: Vec<ModelCategory>,
    /// Category or entry name used when no `model_key` is specified.
    #[serde(default = "d_default")]
    pub default: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCategory {
    pub category: String,
    pub model: String,
}

impl ModelsConfig {
    /// Resolve `model_key` (a category name, then a direct entry name) to a
    /// concrete `ModelEntry`. Mirrors the original `select_model` precedence.
    pub fn resolve(&self, model_key: &str) -> Option<&ModelEntry> {
        let entry_name = self
            .categories
            .iter()
            .find(|c| c.category == model_key)
            .map(|c| c.model.as_str())
            .unwrap_or(model_key);
        self.list.iter().find(|e| e.name == entry_name)
    }
}

fn d_default() -> String {
    "default".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModelsConfig {
        ModelsConfig {
            list: vec![ModelEntry {
                name: "local-qwen".into(),
                model: "qwen2.5".into(),
                api_key_env: None,
                max_tokens: Some(8192),
            }],
            categories: vec![ModelCategory {
                category: "default".into(),
                model: "local-qwen".into(),
            }],
            default: "default".into(),
        }
    }

    #[test]
    fn resolve_via_category() {
        let cfg = sample();
        let entry = cfg.resolve("default").unwrap();
        assert_eq!(entry.name, "local-qwen");
        assert_eq!(entry.model, "qwen2.5");
    }

    #[test]
    fn resolve_direct_entry_name() {
        let cfg = sample();
        let entry = cfg.resolve("local-qwen").unwrap();
        assert_eq!(entry.model, "qwen2.5");
    }

    #[test]
    fn resolve_unknown_key_returns_none() {
        let cfg = sample();
        assert!(cfg.resolve("nonexistent").is_none());
    }
}
