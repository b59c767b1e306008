//! Tool call rows.
//!
//! Invariant carried over from the original implementation: the row is
//! inserted *before* execution so a process crash never loses the fact that
//! a tool was about to run. Callers must call [`ToolCalls::record_pending`]
//! before invoking the tool callable, never after.

use crate::ids::{new_id, now};
use crate::store::Store;
use sa_domain::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub invocation_id: String,
    pub tool_name: String,
    pub parameters: String,
    pub risk_level: String,
    pub result: Option<String>,
    pub status: String,
    pub created_at: String,
    pub executed_at: Option<String>,
}

pub struct ToolCalls<'a> {
    store: &'a Store,
}

impl<'a> ToolCalls<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert the row in `pending` status, before the tool callable runs.
    pub fn record_pending(
        &self,
        invocation_id: &str,
        tool_name: &str,
        parameters: &str,
        risk_level: &str,
    ) -> Result<String> {
        let id = new_id();
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "INSERT INTO tool_calls
                    (id, invocation_id, tool_name, parameters, risk_level, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
                rusqlite::params![id, invocation_id, tool_name, parameters, risk_level, ts],
            )
            .map(|_| ())
        })?;
        Ok(id)
    }

    /// Record the outcome of a tool call that actually ran.
    pub fn record_executed(&self, tool_call_id: &str, result: &str) -> Result<()> {
        self.transition(tool_call_id, "executed", Some(result))
    }

    /// Record that the tool callable threw.
    pub fn record_failed(&self, tool_call_id: &str, error: &str) -> Result<()> {
        self.transition(tool_call_id, "failed", Some(error))
    }

    /// Record that the approval gate denied the call, so it was never run.
    pub fn record_denied(&self, tool_call_id: &str) -> Result<()> {
        self.transition(tool_call_id, "denied", None)
    }

    fn transition(&self, tool_call_id: &str, status: &str, result: Option<&str>) -> Result<()> {
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "UPDATE tool_calls SET status = ?2, result = ?3, executed_at = ?4 WHERE id = ?1",
                rusqlite::params![tool_call_id, status, result, ts],
            )
            .map(|_| ())
        })
    }

    pub fn list_for_invocation(&self, invocation_id: &str) -> Result<Vec<ToolCall>> {
        self.store.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT id, invocation_id, tool_name, parameters, risk_level, result, status,
                        created_at, executed_at
                 FROM tool_calls WHERE invocation_id = ?1 ORDER BY created_at ASC",
            )?;
            stmt.query_map([invocation_id], Self::row_to_tool_call)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })
    }

    fn row_to_tool_call(row: &rusqlite::Row) -> rusqlite::Result<ToolCall> {
        Ok(ToolCall {
            id: row.get(0)?,
            invocation_id: row.get(1)?,
            tool_name: row.get(2)?,
            parameters: row.get(3)?,
            risk_level: row.get(4)?,
            result: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
            executed_at: row.get(8)?,
        })
    }
}
