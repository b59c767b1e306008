//! Context manager (C5): three-tier per-project context assembly.
//!
//! 1. **Brief** — small, stable, human-authored. Injected verbatim.
//! 2. **Summary** — compacted prose owned by this module.
//! 3. **Recent window** — append-only history rows within a token budget.
//!
//! Token accounting is an approximation (`chars / 4`); exactness is
//! unnecessary and a real tokeniser dependency is deliberately not carried.

use crate::ids::{new_id, now};
use crate::store::Store;
use async_trait::async_trait;
use sa_domain::error::Result;
use serde::{Deserialize, Serialize};

/// Approximate token count for a piece of text. A ~30% error does not affect
/// budget-boundary behaviour; do not replace with a real tokeniser.
pub fn approx_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub brief: Option<String>,
    pub summary: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub project_id: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// Abstracts the single LLM call `maybe_summarise` needs to produce a dense
/// factual summary. The store crate does not depend on the provider crate —
/// the engine supplies this at the call site, backed by whatever
/// `LlmProvider` the invocation is already using.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarise(&self, prompt: &str) -> Result<String>;
}

pub struct ContextManager<'a> {
    store: &'a Store,
}

impl<'a> ContextManager<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Guarantee a project row exists. `INSERT OR IGNORE` makes this
    /// idempotent: safe to call before every invocation without checking
    /// first. Never overwrites an existing name, brief, or summary.
    pub fn ensure_project(&self, project_id: &str, name: &str) -> Result<()> {
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "INSERT OR IGNORE INTO projects (id, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                rusqlite::params![project_id, name, ts],
            )
            .map(|_| ())
        })
    }

    pub fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        self.store.with_tx(|tx| {
            tx.query_row(
                "SELECT id, name, brief, summary, created_at, updated_at FROM projects WHERE id = ?1",
                [project_id],
                |row| {
                    Ok(Project {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        brief: row.get(2)?,
                        summary: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
        })
    }

    /// Build the context string to inject between the system prompt and the
    /// task. Returns `""` if the project does not exist or all three tiers
    /// are empty, so the caller can skip injection entirely.
    ///
    /// Recent history is collected newest-first until the token budget is
    /// consumed, then reversed to chronological order so the prompt reads
    /// naturally.
    pub fn assemble_context(&self, project_id: &str, recent_buffer_tokens: usize) -> Result<String> {
        let Some(project) = self.get_project(project_id)? else {
            return Ok(String::new());
        };
        let brief = project.brief.unwrap_or_default();
        let summary = project.summary.unwrap_or_default();

        let rows: Vec<(String, String)> = self.store.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT role, content FROM history WHERE project_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([project_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        let mut recent_rows: Vec<(String, String)> = Vec::new();
        let mut budget = recent_buffer_tokens as i64;
        for (role, content) in rows {
            if budget <= 0 {
                break;
            }
            let entry = format!("[{}] {}", role.to_uppercase(), content);
            budget -= approx_tokens(&entry) as i64;
            recent_rows.push((role, content));
        }
        recent_rows.reverse();

        if brief.is_empty() && summary.is_empty() && recent_rows.is_empty() {
            return Ok(String::new());
        }

        let mut lines = vec!["=== PROJECT CONTEXT ===".to_string(), String::new()];
        lines.push("[BRIEF]".to_string());
        lines.push(if brief.is_empty() { "(none)".into() } else { brief });
        lines.push(String::new());
        lines.push("[SUMMARY]".to_string());
        lines.push(if summary.is_empty() { "(none)".into() } else { summary });
        lines.push(String::new());
        lines.push("[RECENT HISTORY]".to_string());
        for (role, content) in recent_rows {
            lines.push(format!("[{}] {}", role.to_uppercase(), content));
        }
        lines.push("=== END CONTEXT ===".to_string());

        Ok(lines.join("\n"))
    }

    /// Insert one history row. Called twice after each invocation: once for
    /// the user task, once for the agent's final response.
    pub fn append_to_history(&self, project_id: &str, role: &str, content: &str) -> Result<()> {
        let id = new_id();
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "INSERT INTO history (id, project_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, project_id, role, content, ts],
            )
            .map(|_| ())
        })
    }

    /// Compress old history into `projects.summary` if the recent buffer is
    /// over budget. Does nothing (no model call, no mutation) when the
    /// total is within budget — this keeps the common case of short-lived
    /// projects cheap.
    pub async fn maybe_summarise(
        &self,
        project_id: &str,
        recent_buffer_tokens: usize,
        summarizer: &dyn Summarizer,
    ) -> Result<()> {
        let rows: Vec<(String, String, String)> = self.store.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT id, role, content FROM history WHERE project_id = ?1 ORDER BY created_at ASC",
            )?;
            stmt.query_map([project_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        if rows.is_empty() {
            return Ok(());
        }

        let total_tokens: usize = rows.iter().map(|(_, _, content)| approx_tokens(content)).sum();
        if total_tokens <= recent_buffer_tokens {
            return Ok(());
        }

        // Determine the split point: summarise oldest rows until compressing
        // enough that the remainder fits within the budget. `target` is
        // guaranteed > 0 because total_tokens > recent_buffer_tokens above.
        let target = total_tokens - recent_buffer_tokens;
        let mut accumulated = 0usize;
        let mut split_index = 0usize;
        for (i, (_, _, content)) in rows.iter().enumerate() {
            accumulated += approx_tokens(content);
            if accumulated >= target {
                split_index = i + 1;
                break;
            }
        }
        if split_index == 0 {
            split_index = 1;
        }
        let to_summarise = &rows[..split_index];

        let existing_summary = self
            .get_project(project_id)?
            .and_then(|p| p.summary)
            .unwrap_or_default();

        let history_text = to_summarise
            .iter()
            .map(|(_, role, content)| format!("[{}] {}", role.to_uppercase(), content))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "You are a context compressor. Produce a concise summary of the \
             conversation history below, incorporating any existing summary.\n\n\
             Existing summary:\n{}\n\n\
             New history to incorporate:\n{}\n\n\
             Write a dense, factual summary. Preserve key decisions, outcomes, and \
             open questions. Omit pleasantries and repetition. Output only the summary.",
            if existing_summary.is_empty() { "(none)" } else { &existing_summary },
            history_text,
        );

        let new_summary = summarizer.summarise(&prompt).await?;
        let ids_to_delete: Vec<&str> = to_summarise.iter().map(|(id, _, _)| id.as_str()).collect();
        let ts = now();
        tracing::info!(
            project_id,
            rows_compacted = ids_to_delete.len(),
            total_tokens,
            "compacted project history into summary"
        );

        self.store.with_tx(|tx| {
            for id in &ids_to_delete {
                tx.execute("DELETE FROM history WHERE id = ?1", [id])?;
            }
            tx.execute(
                "UPDATE projects SET summary = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![project_id, new_summary, ts],
            )?;
            Ok(())
        })
    }
}
