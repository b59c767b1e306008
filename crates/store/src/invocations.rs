//! Invocation rows. One event produces zero or one invocation; this module
//! is the write side C8 (the agent invocation engine) uses to record a run
//! from start to terminal status.

use crate::ids::{new_id, now};
use crate::store::Store;
use sa_domain::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    pub id: String,
    pub event_id: Option<String>,
    pub agent_type: String,
    pub model: String,
    pub project_id: Option<String>,
    pub context: Option<String>,
    pub response: Option<String>,
    pub tool_calls: Option<String>,
    pub status: String,
    pub started_at: String,
    pub finished_at: Option<String>,
}

pub struct Invocations<'a> {
    store: &'a Store,
}

impl<'a> Invocations<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Open a new invocation row in `running` status. Returns the new id.
    pub fn start(
        &self,
        event_id: Option<&str>,
        agent_type: &str,
        model: &str,
        project_id: Option<&str>,
        context: Option<&str>,
    ) -> Result<String> {
        let id = new_id();
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "INSERT INTO invocations
                    (id, event_id, agent_type, model, project_id, context, status, started_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'running', ?7)",
                rusqlite::params![id, event_id, agent_type, model, project_id, context, ts],
            )
            .map(|_| ())
        })?;
        Ok(id)
    }

    /// Transition to a terminal status (`done` or `failed`), recording the
    /// final response text and a summary of the tool calls made.
    pub fn finish(
        &self,
        invocation_id: &str,
        status: &str,
        response: Option<&str>,
        tool_calls_summary: Option<&str>,
    ) -> Result<()> {
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "UPDATE invocations
                 SET status = ?2, response = ?3, tool_calls = ?4, finished_at = ?5
                 WHERE id = ?1",
                rusqlite::params![invocation_id, status, response, tool_calls_summary, ts],
            )
            .map(|_| ())
        })
    }

    pub fn get(&self, invocation_id: &str) -> Result<Option<Invocation>> {
        self.store.with_tx(|tx| {
            tx.query_row(
                "SELECT id, event_id, agent_type, model, project_id, context, response,
                        tool_calls, status, started_at, finished_at
                 FROM invocations WHERE id = ?1",
                [invocation_id],
                Self::row_to_invocation,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
        })
    }

    fn row_to_invocation(row: &rusqlite::Row) -> rusqlite::Result<Invocation> {
        Ok(Invocation {
            id: row.get(0)?,
            event_id: row.get(1)?,
            agent_type: row.get(2)?,
            model: row.get(3)?,
            project_id: row.get(4)?,
            context: row.get(5)?,
            response: row.get(6)?,
            tool_calls: row.get(7)?,
            status: row.get(8)?,
            started_at: row.get(9)?,
            finished_at: row.get(10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_then_finish_transitions_to_terminal_status() {
        let store = Store::open_in_memory().unwrap();
        let inv = Invocations::new(&store);
        let id = inv
            .start(Some("evt_1"), "default", "gpt-4o", Some("p1"), None)
            .unwrap();

        let running = inv.get(&id).unwrap().unwrap();
        assert_eq!(running.status, "running");
        assert!(running.finished_at.is_none());

        inv.finish(&id, "done", Some("pong"), Some("[]")).unwrap();
        let done = inv.get(&id).unwrap().unwrap();
        assert_eq!(done.status, "done");
        assert_eq!(done.response.as_deref(), Some("pong"));
        assert!(done.finished_at.is_some());
    }

    #[test]
    fn get_missing_invocation_returns_none() {
        let store = Store::open_in_memory().unwrap();
        let inv = Invocations::new(&store);
        assert!(inv.get("nope").unwrap().is_none());
    }
}
