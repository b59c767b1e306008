//! Approval gate (C7).
//!
//! `[SAFETY-CRITICAL]`: ported from `core/approval_gate.py`. The ordering in
//! `ApprovalGate::request` is an invariant, not a style choice — the approval
//! row must exist *before* the human (or auto-deny path) ever sees the
//! prompt, and must be updated *before* this call returns, so there is never
//! a window where a tool could run with no record of the decision.
//!
//! The oneshot/keyed-map concurrency shape is adapted from the existing
//! gateway's `runtime::approval::ApprovalStore`; the driving logic — what to
//! insert, when to auto-deny, what the terminal prompt looks like — is
//! ported from `approval_gate.py` instead of that file's HTTP-resolved-later
//! model, since this gate is a blocking call on the supervisor's own task,
//! not a separately-resolved REST endpoint.

use std::io::Write as _;
use std::sync::Arc;

use sa_store::{Approvals, Store};

/// Whether the approval gate has a human attached, decided once at
/// supervisor startup from a `stdin.isatty()`-style check. Matches the
/// original's `sys.stdin.isatty()` gate: every event coming through the
/// HTTP or timer adapters runs `NonInteractive`, so high-risk tools
/// triggered by those sources are always denied. This is by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalChannel {
    Terminal,
    NonInteractive,
}

pub struct ApprovalGate {
    store: Arc<Store>,
    channel: ApprovalChannel,
}

impl ApprovalGate {
    pub fn new(store: Arc<Store>, channel: ApprovalChannel) -> Self {
        Self { store, channel }
    }

    /// Request approval for a high-risk tool call. Blocks until a decision
    /// is recorded. Returns `true` only if a human explicitly approved.
    pub async fn request(
        &self,
        tool_name: &str,
        parameters: &serde_json::Value,
        agent_type: &str,
        project_id: Option<&str>,
        tool_call_id: &str,
    ) -> sa_domain::error::Result<bool> {
        let prompt = build_prompt(tool_name, parameters, agent_type, project_id);

        // 1. Insert the approval row before any human interaction.
        let approval_id = {
            let approvals = Approvals::new(&self.store);
            approvals.record_prompt(tool_call_id, &prompt)?
        };

        // 2. Non-interactive context: auto-deny, record, return.
        if self.channel == ApprovalChannel::NonInteractive {
            tracing::warn!(
                tool_call_id,
                tool_name,
                "approval auto-denied — no controlling terminal"
            );
            let approvals = Approvals::new(&self.store);
            approvals.record_response(&approval_id, "denied")?;
            return Ok(false);
        }

        // 3. Interactive: print the prompt and block on stdin, off the
        //    cooperative scheduler so a slow human never stalls it.
        let approved = tokio::task::spawn_blocking(move || prompt_and_read(&prompt))
            .await
            .unwrap_or(false);

        // 4. Update the row before returning.
        let approvals = Approvals::new(&self.store);
        approvals.record_response(&approval_id, if approved { "approved" } else { "denied" })?;

        Ok(approved)
    }
}

fn build_prompt(
    tool_name: &str,
    parameters: &serde_json::Value,
    agent_type: &str,
    project_id: Option<&str>,
) -> String {
    let separator = "=".repeat(60);
    let project_str = project_id.unwrap_or("(none)");
    let params_pretty =
        serde_json::to_string_pretty(parameters).unwrap_or_else(|_| parameters.to_string());
    format!(
        "{separator}\n[APPROVAL REQUIRED]\nAgent: {agent_type}  |  Project: {project_str}  |  Risk: high\nTool: {tool_name}\n{params_pretty}\n{separator}\n"
    )
}

/// Print the prompt and read a y/N answer from stdin. Any error, EOF, or
/// non-"y" answer is treated as a deny.
fn prompt_and_read(prompt: &str) -> bool {
    print!("{prompt}Approve? [y/N]: ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match std::io::stdin().read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<Store> {
        Arc::new(Store::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn non_interactive_auto_denies_and_records() {
        let store = store();
        let gate = ApprovalGate::new(store.clone(), ApprovalChannel::NonInteractive);
        let approved = gate
            .request(
                "shell_run",
                &serde_json::json!({"program": "rm"}),
                "task_agent",
                Some("proj-1"),
                "tc_1",
            )
            .await
            .unwrap();
        assert!(!approved);

        // The row for tc_1 must exist and be recorded as denied.
        let row = store
            .with_tx(|tx| {
                tx.query_row(
                    "SELECT response FROM approvals WHERE tool_call_id = ?1",
                    ["tc_1"],
                    |row| row.get::<_, Option<String>>(0),
                )
            })
            .unwrap();
        assert_eq!(row.as_deref(), Some("denied"));
    }

    #[test]
    fn build_prompt_includes_tool_and_project() {
        let prompt = build_prompt(
            "shell_run",
            &serde_json::json!({"program": "ls"}),
            "task_agent",
            Some("proj-1"),
        );
        assert!(prompt.contains("shell_run"));
        assert!(prompt.contains("proj-1"));
        assert!(prompt.contains("[APPROVAL REQUIRED]"));
    }

    #[test]
    fn build_prompt_handles_missing_project() {
        let prompt = build_prompt("shell_run", &serde_json::json!({}), "task_agent", None);
        assert!(prompt.contains("(none)"));
    }
}
