use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Default project binding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Project id an event binds to when its payload carries none.
    #[serde(default)]
    pub default_project_id: Option<String>,
    /// Human-readable name used when `ensure_project` first creates
    /// `default_project_id`.
    #[serde(default = "d_default_project_name")]
    pub default_project_name: String,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            default_project_id: None,
            default_project_name: d_default_project_name(),
        }
    }
}

fn d_default_project_name() -> String {
    "default".into()
}
