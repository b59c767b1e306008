use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Filesystem paths
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Durable store file. `~` and environment variables are expanded by
    /// the config loader before this struct is populated.
    #[serde(default = "d_db")]
    pub db: PathBuf,
    /// Directories `read_file`/`list_directory` may read from.
    #[serde(default)]
    pub allowed_read: Vec<PathBuf>,
    /// Directories tools may write to. Subset of `allowed_read` in practice,
    /// but kept separate since read and write allowlists can legitimately
    /// diverge.
    #[serde(default)]
    pub allowed_write: Vec<PathBuf>,
    /// Directory for log file output, if file logging is enabled.
    #[serde(default = "d_logs")]
    pub logs: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            db: d_db(),
            allowed_read: Vec::new(),
            allowed_write: Vec::new(),
            logs: d_logs(),
        }
    }
}

impl PathsConfig {
    /// True if `path` is contained within one of `roots` after both sides
    /// are lexically normalized. Callers are expected to canonicalize
    /// `path` first so `..` traversal cannot escape an allowed root.
    pub fn is_within(roots: &[PathBuf], path: &Path) -> bool {
        roots.iter().any(|root| path.starts_with(root))
    }

    pub fn is_readable(&self, path: &Path) -> bool {
        Self::is_within(&self.allowed_read, path)
    }

    pub fn is_writable(&self, path: &Path) -> bool {
        Self::is_within(&self.allowed_write, path)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_db() -> PathBuf {
    PathBuf::from("orchestrator.db")
}
fn d_logs() -> PathBuf {
    PathBuf::from("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_no_allowlisted_roots() {
        let cfg = PathsConfig::default();
        assert!(cfg.allowed_read.is_empty());
        assert!(cfg.allowed_write.is_empty());
    }

    #[test]
    fn is_within_matches_prefix() {
        let roots = vec![PathBuf::from("/srv/data")];
        assert!(PathsConfig::is_within(&roots, Path::new("/srv/data/file.txt")));
        assert!(!PathsConfig::is_within(&roots, Path::new("/etc/passwd")));
    }

    #[test]
    fn is_within_rejects_sibling_with_shared_prefix() {
        let roots = vec![PathBuf::from("/srv/data")];
        assert!(!PathsConfig::is_within(&roots, Path::new("/srv/data-other/file.txt")));
    }
}
