//! Approval rows (C7's persistence side).
//!
//! Invariant: a row is written before the prompt is displayed to the human,
//! and updated with the response before the gate returns. This module only
//! handles persistence; the interactive/non-interactive decision and the
//! terminal I/O live in the gateway's approval gate.

use crate::ids::{new_id, now};
use crate::store::Store;
use sa_domain::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    pub tool_call_id: String,
    pub prompt: String,
    pub response: Option<String>,
    pub created_at: String,
    pub responded_at: Option<String>,
}

pub struct Approvals<'a> {
    store: &'a Store,
}

impl<'a> Approvals<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert the row before the prompt is shown. Returns the new id.
    pub fn record_prompt(&self, tool_call_id: &str, prompt: &str) -> Result<String> {
        let id = new_id();
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "INSERT INTO approvals (id, tool_call_id, prompt, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, tool_call_id, prompt, ts],
            )
            .map(|_| ())
        })?;
        Ok(id)
    }

    /// Record the human's decision (`"approved"` or `"denied"`).
    pub fn record_response(&self, approval_id: &str, response: &str) -> Result<()> {
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "UPDATE approvals SET response = ?2, responded_at = ?3 WHERE id = ?1",
                rusqlite::params![approval_id, response, ts],
            )
            .map(|_| ())
        })
    }

    pub fn get(&self, approval_id: &str) -> Result<Option<Approval>> {
        self.store.with_tx(|tx| {
            tx.query_row(
                "SELECT id, tool_call_id, prompt, response, created_at, responded_at
                 FROM approvals WHERE id = ?1",
                [approval_id],
                |row| {
                    Ok(Approval {
                        id: row.get(0)?,
                        tool_call_id: row.get(1)?,
                        prompt: row.get(2)?,
                        response: row.get(3)?,
                        created_at: row.get(4)?,
                        responded_at: row.get(5)?,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_prompt_then_response_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let approvals = Approvals::new(&store);
        let id = approvals.record_prompt("tc_1", "run shell_run(ls)?").unwrap();

        let row = approvals.get(&id).unwrap().unwrap();
        assert!(row.response.is_none());

        approvals.record_response(&id, "approved").unwrap();
        let row = approvals.get(&id).unwrap().unwrap();
        assert_eq!(row.response.as_deref(), Some("approved"));
        assert!(row.responded_at.is_some());
    }
}
