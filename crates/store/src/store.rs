//! Durable store (C1).
//!
//! Single-writer, multi-reader embedded store with a crash-durable journaling
//! mode. Schema is loaded idempotently at startup. Every other module in this
//! crate builds on [`Store::with_tx`] — the scoped-acquisition primitive that
//! commits on success, rolls back on failure, and always releases.

use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use sa_domain::error::{Error, Result};
use std::path::Path;

const SCHEMA: &str = include_str!("schema.sql");

/// Convert a [`rusqlite::Error`] into the domain error type.
pub(crate) fn store_err(e: rusqlite::Error) -> Error {
    Error::Store(e.to_string())
}

/// The embedded SQLite-backed store.
///
/// Holds a single connection behind a mutex rather than a pool — the
/// concurrency model has exactly one writer task (the supervisor's dequeue
/// loop); a pool would only add contention without adding parallelism.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path`, enable WAL journaling, and
    /// run the embedded schema. Safe to call against an existing database —
    /// every `CREATE TABLE` is `IF NOT EXISTS`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path.as_ref()).map_err(store_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(store_err)?;
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        tracing::info!(db_path = %path.as_ref().display(), "store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store. Used by tests only.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Scoped transaction: begins a transaction, runs `f`, commits on `Ok`,
    /// rolls back on `Err`. This is the primitive every table module uses
    /// so no row mutation ever crosses this boundary without a transaction.
    pub fn with_tx<T>(&self, f: impl FnOnce(&Transaction) -> rusqlite::Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(store_err)?;
        let result = f(&tx);
        match result {
            Ok(value) => {
                tx.commit().map_err(store_err)?;
                Ok(value)
            }
            Err(e) => {
                // Transaction is rolled back automatically when `tx` is
                // dropped without a commit; this is an explicit statement
                // of that, not an extra operation.
                drop(tx);
                Err(store_err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_creates_all_tables() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx(|tx| {
                tx.execute("INSERT INTO projects (id, name, created_at, updated_at) VALUES ('p1','demo','t','t')", [])
            })
            .unwrap();
    }

    #[test]
    fn with_tx_rolls_back_on_error() {
        let store = Store::open_in_memory().unwrap();
        let err = store.with_tx(|tx| {
            tx.execute(
                "INSERT INTO projects (id, name, created_at, updated_at) VALUES ('p1','demo','t','t')",
                [],
            )?;
            tx.execute("INSERT INTO nonexistent_table VALUES (1)", [])
        });
        assert!(err.is_err());

        let count: i64 = store
            .with_tx(|tx| tx.query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn reopening_an_existing_file_store_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orchestrator.db");
        {
            let store = Store::new(&path).unwrap();
            store
                .with_tx(|tx| {
                    tx.execute(
                        "INSERT INTO projects (id, name, created_at, updated_at) VALUES ('p1','demo','t','t')",
                        [],
                    )
                })
                .unwrap();
        }
        let store = Store::new(&path).unwrap();
        let count: i64 = store
            .with_tx(|tx| tx.query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(count, 1);
    }
}
