//! Task rows. Persisted by the store regardless of whether a `tasks` tool
//! implementation (out of scope here) ever reads them back.

use crate::ids::{new_id, now};
use crate::store::Store;
use sa_domain::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub source: String,
    pub priority: i64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct Tasks<'a> {
    store: &'a Store,
}

impl<'a> Tasks<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn create(
        &self,
        project_id: Option<&str>,
        title: &str,
        description: Option<&str>,
        source: &str,
        priority: i64,
    ) -> Result<String> {
        let id = new_id();
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "INSERT INTO tasks
                    (id, project_id, title, description, source, priority, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'open', ?7, ?7)",
                rusqlite::params![id, project_id, title, description, source, priority, ts],
            )
            .map(|_| ())
        })?;
        Ok(id)
    }

    pub fn set_status(&self, task_id: &str, status: &str) -> Result<()> {
        let ts = now();
        self.store.with_tx(|tx| {
            tx.execute(
                "UPDATE tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![task_id, status, ts],
            )
            .map(|_| ())
        })
    }

    pub fn get(&self, task_id: &str) -> Result<Option<Task>> {
        self.store.with_tx(|tx| {
            tx.query_row(
                "SELECT id, project_id, title, description, source, priority, status,
                        created_at, updated_at
                 FROM tasks WHERE id = ?1",
                [task_id],
                Self::row_to_task,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
        })
    }

    pub fn list_for_project(&self, project_id: &str) -> Result<Vec<Task>> {
        self.store.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT id, project_id, title, description, source, priority, status,
                        created_at, updated_at
                 FROM tasks WHERE project_id = ?1 ORDER BY priority ASC, created_at ASC",
            )?;
            stmt.query_map([project_id], Self::row_to_task)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            source: row.get(4)?,
            priority: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_set_status() {
        let store = Store::open_in_memory().unwrap();
        let tasks = Tasks::new(&store);
        let id = tasks
            .create(Some("p1"), "write tests", None, "agent", 5)
            .unwrap();

        let task = tasks.get(&id).unwrap().unwrap();
        assert_eq!(task.status, "open");

        tasks.set_status(&id, "in_progress").unwrap();
        assert_eq!(tasks.get(&id).unwrap().unwrap().status, "in_progress");
    }

    #[test]
    fn list_for_project_orders_by_priority() {
        let store = Store::open_in_memory().unwrap();
        let tasks = Tasks::new(&store);
        tasks.create(Some("p1"), "low priority", None, "agent", 9).unwrap();
        tasks.create(Some("p1"), "urgent", None, "agent", 1).unwrap();

        let rows = tasks.list_for_project("p1").unwrap();
        assert_eq!(rows[0].title, "urgent");
    }
}
