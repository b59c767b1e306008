//! Illustrative filesystem tools: `read_file`, `list_directory`, `write_file`.
//!
//! Individual tool implementations are out of scope for this crate's spec —
//! these exist only to exercise the registry, schema validation, and
//! approval gate end to end, mirroring the shapes of the original
//! `tools/filesystem.py` factories (`read_file`/`write_file`/
//! `list_directory`, each closing over an `allowed_paths` list). Access is
//! scoped through `PathsConfig::allowed_read`/`allowed_write`; containment
//! is checked with `Path::starts_with` on a canonicalized path, never a
//! string prefix (symlinks and relative components would defeat that).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sa_domain::config::PathsConfig;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::tool::{RiskLevel, Tool, ToolError};

fn resolve_within(path_str: &str, roots: &[PathBuf]) -> Result<PathBuf, String> {
    let requested = Path::new(path_str);
    let candidate = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| format!("cannot resolve current directory: {e}"))?
            .join(requested)
    };
    let resolved = canonicalize_best_effort(&candidate)?;
    if !PathsConfig::is_within(roots, &resolved) {
        return Err(format!("path '{path_str}' is not within an allowed root"));
    }
    Ok(resolved)
}

/// Canonicalize `candidate`, walking up to the nearest existing ancestor
/// first if it doesn't exist yet (e.g. a file about to be created).
fn canonicalize_best_effort(candidate: &Path) -> Result<PathBuf, String> {
    if candidate.exists() {
        return candidate
            .canonicalize()
            .map_err(|e| format!("cannot resolve '{}': {e}", candidate.display()));
    }
    let mut existing = candidate;
    let mut tail: Vec<&OsStr> = Vec::new();
    loop {
        if existing.exists() {
            break;
        }
        match existing.parent() {
            Some(parent) => {
                if let Some(name) = existing.file_name() {
                    tail.push(name);
                }
                existing = parent;
            }
            None => break,
        }
    }
    let mut resolved = existing
        .canonicalize()
        .map_err(|e| format!("cannot resolve ancestor of '{}': {e}", candidate.display()))?;
    for part in tail.into_iter().rev() {
        resolved.push(part);
    }
    Ok(resolved)
}

// ── read_file ────────────────────────────────────────────────────────

pub struct ReadFileTool {
    paths: Arc<PathsConfig>,
    schema: Value,
}

impl ReadFileTool {
    pub fn new(paths: Arc<PathsConfig>) -> Self {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "offset": {"type": "integer"},
                "limit": {"type": "integer"},
            },
            "required": ["path"],
            "additionalProperties": false,
        });
        Self { paths, schema }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }
    fn description(&self) -> &str {
        "Read a file's contents, optionally a line range, from an allowed directory."
    }
    fn parameters_schema(&self) -> &Value {
        &self.schema
    }
    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Low
    }

    async fn call(&self, params: Value) -> Result<Value, ToolError> {
        let path_str = params["path"].as_str().unwrap_or_default();
        let resolved = resolve_within(path_str, &self.paths.allowed_read)
            .map_err(ToolError::Execution)?;

        let content = fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::Execution(format!("failed to read '{path_str}': {e}")))?;

        let lines: Vec<&str> = content.lines().collect();
        let total_lines = lines.len();
        let offset = params.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
        let limit = params
            .get("limit")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(total_lines.saturating_sub(offset));

        let selected: Vec<&str> = lines.into_iter().skip(offset).take(limit).collect();
        Ok(serde_json::json!({
            "path": path_str,
            "content": selected.join("\n"),
            "total_lines": total_lines,
            "offset": offset,
            "lines_returned": selected.len(),
        }))
    }
}

// ── list_directory ──────────────────────────────────────────────────

pub struct ListDirectoryTool {
    paths: Arc<PathsConfig>,
    schema: Value,
}

impl ListDirectoryTool {
    pub fn new(paths: Arc<PathsConfig>) -> Self {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"path": {"type": "string"}},
            "required": [],
            "additionalProperties": false,
        });
        Self { paths, schema }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }
    fn description(&self) -> &str {
        "List entries of a directory within an allowed root, with size/mtime metadata."
    }
    fn parameters_schema(&self) -> &Value {
        &self.schema
    }
    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Low
    }

    async fn call(&self, params: Value) -> Result<Value, ToolError> {
        let path_str = params.get("path").and_then(Value::as_str).unwrap_or(".");
        let resolved =
            resolve_within(path_str, &self.paths.allowed_read).map_err(ToolError::Execution)?;

        let mut read_dir = fs::read_dir(&resolved)
            .await
            .map_err(|e| ToolError::Execution(format!("failed to read directory '{path_str}': {e}")))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| ToolError::Execution(format!("failed to read directory entry: {e}")))?
        {
            let metadata = entry.metadata().await.map_err(|e| {
                ToolError::Execution(format!(
                    "failed to read metadata for '{}': {e}",
                    entry.path().display()
                ))
            })?;
            let modified = metadata
                .modified()
                .ok()
                .map(|t| {
                    let dt: DateTime<Utc> = t.into();
                    dt.to_rfc3339()
                })
                .unwrap_or_default();
            entries.push(serde_json::json!({
                "name": entry.file_name().to_string_lossy(),
                "size": metadata.len(),
                "modified": modified,
                "is_dir": metadata.is_dir(),
            }));
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(serde_json::json!({
            "path": path_str,
            "count": entries.len(),
            "entries": entries,
        }))
    }
}

// ── write_file ───────────────────────────────────────────────────────

pub struct WriteFileTool {
    paths: Arc<PathsConfig>,
    schema: Value,
}

impl WriteFileTool {
    pub fn new(paths: Arc<PathsConfig>) -> Self {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "content": {"type": "string"},
            },
            "required": ["path", "content"],
            "additionalProperties": false,
        });
        Self { paths, schema }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }
    fn description(&self) -> &str {
        "Write (create or overwrite) a file within an allowed directory."
    }
    fn parameters_schema(&self) -> &Value {
        &self.schema
    }
    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    async fn call(&self, params: Value) -> Result<Value, ToolError> {
        let path_str = params["path"].as_str().unwrap_or_default();
        let content = params["content"].as_str().unwrap_or_default();
        let resolved = resolve_within_for_write(path_str, &self.paths.allowed_write)
            .map_err(ToolError::Execution)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::Execution(format!("failed to create parent directory: {e}")))?;
        }

        let tmp_name = format!(
            ".{}.{}.tmp",
            resolved.file_name().unwrap_or_default().to_string_lossy(),
            uuid::Uuid::new_v4().as_simple()
        );
        let tmp_path = resolved.with_file_name(tmp_name);

        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| ToolError::Execution(format!("failed to create temp file: {e}")))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| ToolError::Execution(format!("failed to write temp file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| ToolError::Execution(format!("failed to flush temp file: {e}")))?;
        file.sync_data()
            .await
            .map_err(|e| ToolError::Execution(format!("failed to sync temp file: {e}")))?;

        fs::rename(&tmp_path, &resolved).await.map_err(|e| {
            ToolError::Execution(format!("failed to rename temp file into place: {e}"))
        })?;

        Ok(serde_json::json!({
            "path": path_str,
            "bytes_written": content.len(),
            "success": true,
        }))
    }
}

/// Like [`resolve_within`], but tolerates a not-yet-existing target file —
/// the write path itself doesn't need to exist, only its allowed root does.
fn resolve_within_for_write(path_str: &str, roots: &[PathBuf]) -> Result<PathBuf, String> {
    resolve_within(path_str, roots)
}
