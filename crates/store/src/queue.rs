//! Event queue (C2).
//!
//! Events flow `pending → processing → done | failed`. The queue is the sole
//! coordination point between adapters (producers) and the supervisor's
//! dequeue loop (the one consumer). It survives process restarts; any
//! `processing` rows left by a crashed run are reset to `pending` by
//! [`EventQueue::reset_stale`], which the supervisor calls at startup.

use crate::ids::{event_id, now};
use crate::store::{store_err, Store};
use sa_domain::error::Result;
use serde::{Deserialize, Serialize};

/// A queued event, as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub project_id: Option<String>,
    pub priority: i64,
    pub payload: serde_json::Value,
    pub status: String,
    pub created_at: String,
    pub processed_at: Option<String>,
}

pub struct EventQueue<'a> {
    store: &'a Store,
}

impl<'a> EventQueue<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert a new event. Duplicates (same deterministic id, computed over
    /// `source`/`type`/canonical `payload`/current hour bucket) are silently
    /// merged — the existing id is returned rather than erroring.
    pub fn push(
        &self,
        source: &str,
        event_type: &str,
        payload: serde_json::Value,
        project_id: Option<&str>,
        priority: i64,
    ) -> Result<String> {
        let id = event_id(source, event_type, &payload);
        let created_at = now();
        let payload_text = payload.to_string();
        self.store.with_tx(|tx| {
            tx.execute(
                "INSERT OR IGNORE INTO events
                    (id, source, type, project_id, priority, payload, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
                rusqlite::params![id, source, event_type, project_id, priority, payload_text, created_at],
            )
        })?;
        Ok(id)
    }

    /// Select the single `pending` row ordered by `(priority ASC, created_at
    /// ASC)`, transition it to `processing`, and return the pre-update
    /// snapshot. The read-then-update shape (rather than one atomic
    /// `UPDATE ... RETURNING`) is intentional — it matches the original
    /// implementation's windowed transition and relies on single-consumer
    /// discipline, not an atomic claim, for correctness.
    pub fn dequeue(&self) -> Result<Option<Event>> {
        self.store.with_tx(|tx| {
            let row = tx
                .query_row(
                    "SELECT id, source, type, project_id, priority, payload, status,
                            created_at, processed_at
                     FROM events
                     WHERE status = 'pending'
                     ORDER BY priority ASC, created_at ASC
                     LIMIT 1",
                    [],
                    Self::row_to_event,
                )
                .ok();

            let Some(event) = row else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE events SET status = 'processing' WHERE id = ?1",
                [&event.id],
            )?;

            Ok(Some(event))
        })
    }

    pub fn complete(&self, event_id: &str) -> Result<()> {
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "UPDATE events SET status = 'done', processed_at = ?2 WHERE id = ?1",
                rusqlite::params![event_id, ts],
            )
            .map(|_| ())
        })
    }

    pub fn fail(&self, event_id: &str) -> Result<()> {
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "UPDATE events SET status = 'failed', processed_at = ?2 WHERE id = ?1",
                rusqlite::params![event_id, ts],
            )
            .map(|_| ())
        })
    }

    /// Reset every row left in `processing` back to `pending`. Called once
    /// at startup to recover from a crash mid-dequeue. Returns the count.
    pub fn reset_stale(&self) -> Result<usize> {
        let n = self.store.with_tx(|tx| {
            tx.execute("UPDATE events SET status = 'pending' WHERE status = 'processing'", [])
        })?;
        if n > 0 {
            tracing::warn!(count = n, "recovered stale events from a prior crash");
        }
        Ok(n)
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<Event> {
        let payload_text: String = row.get("payload")?;
        let payload = serde_json::from_str(&payload_text).unwrap_or(serde_json::Value::Null);
        Ok(Event {
            id: row.get("id")?,
            source: row.get("source")?,
            event_type: row.get("type")?,
            project_id: row.get("project_id")?,
            priority: row.get("priority")?,
            payload,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            processed_at: row.get("processed_at")?,
        })
    }
}

/// Look up a single event by id, regardless of status. Used by tests and by
/// the supervisor to report on an event it just dequeued.
pub fn get_event(store: &Store, id: &str) -> Result<Option<Event>> {
    store.with_tx(|tx| {
        tx.query_row(
            "SELECT id, source, type, project_id, priority, payload, status,
                    created_at, processed_at
             FROM events WHERE id = ?1",
            [id],
            EventQueue::row_to_event,
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(store: &Store) -> EventQueue<'_> {
        EventQueue::new(store)
    }

    #[test]
    fn push_then_dequeue_returns_the_event() {
        let store = Store::open_in_memory().unwrap();
        let q = queue(&store);
        let id = q
            .push("http", "message", serde_json::json!({"message": "hi"}), None, 5)
            .unwrap();
        let e = q.dequeue().unwrap().unwrap();
        assert_eq!(e.id, id);
        assert_eq!(e.status, "pending"); // pre-update snapshot
    }

    #[test]
    fn dequeue_orders_by_priority_then_created_at() {
        let store = Store::open_in_memory().unwrap();
        let q = queue(&store);
        q.push("http", "message", serde_json::json!({"m": "low"}), None, 9)
            .unwrap();
        let high_id = q
            .push("http", "message", serde_json::json!({"m": "high"}), None, 1)
            .unwrap();
        let e = q.dequeue().unwrap().unwrap();
        assert_eq!(e.id, high_id);
    }

    #[test]
    fn duplicate_push_within_same_hour_dedups() {
        let store = Store::open_in_memory().unwrap();
        let q = queue(&store);
        let payload = serde_json::json!({"minute": "12:00"});
        let a = q.push("timer", "tick", payload.clone(), None, 8).unwrap();
        let b = q.push("timer", "tick", payload, None, 8).unwrap();
        assert_eq!(a, b);

        let count: i64 = store
            .with_tx(|tx| tx.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn complete_then_dequeue_does_not_return_it_again() {
        let store = Store::open_in_memory().unwrap();
        let q = queue(&store);
        let id = q
            .push("http", "message", serde_json::json!({}), None, 5)
            .unwrap();
        q.dequeue().unwrap();
        q.complete(&id).unwrap();
        assert!(q.dequeue().unwrap().is_none());
    }

    #[test]
    fn reset_stale_recovers_processing_rows() {
        let store = Store::open_in_memory().unwrap();
        let q = queue(&store);
        q.push("http", "message", serde_json::json!({}), None, 5)
            .unwrap();
        q.dequeue().unwrap(); // now 'processing'

        let n = q.reset_stale().unwrap();
        assert_eq!(n, 1);

        let e = q.dequeue().unwrap().unwrap();
        assert_eq!(e.status, "pending");
    }

    #[test]
    fn empty_queue_dequeues_none() {
        let store = Store::open_in_memory().unwrap();
        let q = queue(&store);
        assert!(q.dequeue().unwrap().is_none());
    }

    #[test]
    fn fail_marks_event_failed_with_timestamp() {
        let store = Store::open_in_memory().unwrap();
        let q = queue(&store);
        let id = q
            .push("http", "message", serde_json::json!({}), None, 5)
            .unwrap();
        q.dequeue().unwrap();
        q.fail(&id).unwrap();

        let e = get_event(&store, &id).unwrap().unwrap();
        assert_eq!(e.status, "failed");
        assert!(e.processed_at.is_some());
    }
}
